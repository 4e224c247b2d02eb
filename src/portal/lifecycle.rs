//! Item status state machine.
//!
//! ```text
//! lost <-> found --> claimed --> completed
//!   \        \          \
//!    `--------`----------`--> discarded
//! ```
//!
//! `lost`, `found` and `claimed` may also jump straight to `completed`.
//! `completed` and `discarded` are terminal. Status writes go through
//! conditional updates so a concurrent writer that moved the item first
//! turns the second write into a `Conflict` instead of silently overwriting it.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, Iterable, QueryFilter};

use crate::db::entities::item;
use crate::db::entities::status::ItemStatus;
use crate::error::{Result, ServerError};

/// Statuses from which a claim may be approved
pub const CLAIMABLE: [ItemStatus; 2] = [ItemStatus::Lost, ItemStatus::Found];

/// Whether the normal update path may move an item from `from` to `to`
pub fn transition_allowed(from: ItemStatus, to: ItemStatus) -> bool {
    use ItemStatus::*;
    matches!(
        (from, to),
        (Lost, Found)
            | (Found, Lost)
            | (Lost | Found, Claimed)
            | (Lost | Found | Claimed, Completed)
            | (Lost | Found | Claimed, Discarded)
    )
}

/// All statuses that may legally move to `to`
pub fn sources_of(to: ItemStatus) -> Vec<ItemStatus> {
    ItemStatus::iter()
        .filter(|from| transition_allowed(*from, to))
        .collect()
}

pub fn is_terminal(status: ItemStatus) -> bool {
    matches!(status, ItemStatus::Completed | ItemStatus::Discarded)
}

/// New items start out either lost or found
pub fn check_initial_status(status: ItemStatus) -> Result<()> {
    if CLAIMABLE.contains(&status) {
        Ok(())
    } else {
        Err(ServerError::Validation(
            "New items must be 'lost' or 'found'".to_string(),
        ))
    }
}

fn status_name(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Lost => "lost",
        ItemStatus::Found => "found",
        ItemStatus::Claimed => "claimed",
        ItemStatus::Completed => "completed",
        ItemStatus::Discarded => "discarded",
    }
}

/// Move an item to `to` only if it is currently in one of `from`.
///
/// Zero affected rows means the item is gone or already elsewhere.
pub async fn transition_item<C: ConnectionTrait>(
    db: &C,
    item_id: i32,
    from: &[ItemStatus],
    to: ItemStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = item::Entity::update_many()
        .col_expr(item::Column::CurrentStatus, Expr::value(to))
        .col_expr(item::Column::LastStatusChange, Expr::value(now))
        .filter(item::Column::Id.eq(item_id))
        .filter(item::Column::CurrentStatus.is_in(from.iter().copied()))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        return Ok(());
    }

    match item::Entity::find_by_id(item_id).one(db).await? {
        None => Err(ServerError::NotFound("Item")),
        Some(current) => Err(ServerError::Conflict(format!(
            "Item is '{}' and cannot become '{}'",
            status_name(current.current_status),
            status_name(to)
        ))),
    }
}

/// Assign a status regardless of the current one
pub async fn force_item_status<C: ConnectionTrait>(
    db: &C,
    item_id: i32,
    to: ItemStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = item::Entity::update_many()
        .col_expr(item::Column::CurrentStatus, Expr::value(to))
        .col_expr(item::Column::LastStatusChange, Expr::value(now))
        .filter(item::Column::Id.eq(item_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServerError::NotFound("Item"));
    }
    Ok(())
}
