//! User accounts: registration, credential checks and dashboards

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;

use super::access::require_role;
use super::views::{self, PendingClaimRow, StudentReportRow, UserView};
use super::Page;
use crate::api::auth::{hash_password, verify_password};
use crate::db::entities::status::{ClaimStatus, Role};
use crate::db::entities::{claim, report, user};
use crate::error::{Result, ServerError};

/// Registration request. Required fields are optional here so a missing
/// field reports which one is absent instead of a generic parse error.
#[derive(Debug, Default, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub roll_number: Option<String>,
    pub password: Option<String>,
    pub branch: Option<String>,
    pub school: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ServerError::Validation(format!("'{}' is required", field))),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn find_by_roll_number<C: ConnectionTrait>(db: &C, roll_number: &str) -> Result<Option<user::Model>> {
    Ok(user::Entity::find()
        .filter(user::Column::RollNumber.eq(roll_number))
        .one(db)
        .await?)
}

/// Register a student account
pub async fn register<C: ConnectionTrait>(db: &C, new_user: NewUser) -> Result<user::Model> {
    create_account(db, new_user, Role::Student).await
}

async fn create_account<C: ConnectionTrait>(db: &C, new_user: NewUser, role: Role) -> Result<user::Model> {
    let name = required(&new_user.name, "name")?.to_string();
    let roll_number = required(&new_user.roll_number, "roll_number")?.to_string();
    let password = required(&new_user.password, "password")?;

    if find_by_roll_number(db, &roll_number).await?.is_some() {
        return Err(ServerError::Conflict("Roll number already registered".to_string()));
    }

    let account = user::ActiveModel {
        name: Set(name),
        roll_number: Set(roll_number),
        password_hash: Set(hash_password(password)?),
        branch: Set(optional(new_user.branch)),
        school: Set(optional(new_user.school)),
        email: Set(optional(new_user.email)),
        phone: Set(optional(new_user.phone)),
        role: Set(role),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Registered user {} ({})", account.id, account.roll_number);
    Ok(account)
}

/// Check a roll number / password pair. Both are trimmed the same way registration trims them.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    roll_number: &str,
    password: &str,
) -> Result<Option<user::Model>> {
    let user = match find_by_roll_number(db, roll_number.trim()).await? {
        Some(u) => u,
        None => return Ok(None),
    };
    if verify_password(password.trim(), &user.password_hash) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

pub async fn find_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Option<user::Model>> {
    Ok(user::Entity::find_by_id(user_id).one(db).await?)
}

/// Create the bootstrap admin account unless the roll number is taken
pub async fn ensure_admin<C: ConnectionTrait>(db: &C, roll_number: &str, password: &str) -> Result<user::Model> {
    if let Some(existing) = find_by_roll_number(db, roll_number).await? {
        if existing.role != Role::Admin {
            tracing::warn!(
                "Bootstrap admin roll number {} belongs to a {} account",
                roll_number,
                existing.role.name()
            );
        }
        return Ok(existing);
    }

    let admin = create_account(
        db,
        NewUser {
            name: Some("Administrator".to_string()),
            roll_number: Some(roll_number.to_string()),
            password: Some(password.to_string()),
            ..Default::default()
        },
        Role::Admin,
    )
    .await?;
    tracing::info!("Created bootstrap admin {}", roll_number);
    Ok(admin)
}

/// Paginated user list (admin only)
pub async fn list_users<C: ConnectionTrait>(db: &C, actor: &user::Model, page: Page) -> Result<Vec<UserView>> {
    require_role(actor, Role::Admin)?;
    let users = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .offset(page.skip)
        .limit(page.limit)
        .all(db)
        .await?;
    Ok(users.iter().map(UserView::from).collect())
}

/// The caller's own reports, newest first
pub async fn student_dashboard<C: ConnectionTrait>(db: &C, actor: &user::Model) -> Result<Vec<StudentReportRow>> {
    let reports = report::Entity::find()
        .filter(report::Column::ReporterId.eq(actor.id))
        .order_by_desc(report::Column::ReportedOn)
        .order_by_desc(report::Column::Id)
        .all(db)
        .await?;

    let items = views::items_by_id(db, reports.iter().map(|r| r.item_id)).await?;
    let locations = views::location_names(db, reports.iter().filter_map(|r| r.location_id)).await?;

    Ok(reports
        .into_iter()
        .map(|r| {
            let item = items.get(&r.item_id);
            StudentReportRow {
                report_id: r.id,
                report_type: r.report_type,
                status: r.status,
                details: r.details,
                reported_on: r.reported_on,
                item_id: r.item_id,
                item_title: item.map(|i| i.title.clone()),
                current_status: item.map(|i| i.current_status),
                location_name: r.location_id.and_then(|id| locations.get(&id).cloned()),
            }
        })
        .collect())
}

/// Undecided claims awaiting an admin, newest first
pub async fn pending_claims<C: ConnectionTrait>(db: &C, actor: &user::Model) -> Result<Vec<PendingClaimRow>> {
    require_role(actor, Role::Admin)?;
    let claims = claim::Entity::find()
        .filter(claim::Column::ClaimStatus.eq(ClaimStatus::Pending))
        .order_by_desc(claim::Column::ClaimedOn)
        .order_by_desc(claim::Column::Id)
        .all(db)
        .await?;

    let items = views::items_by_id(db, claims.iter().map(|c| c.item_id)).await?;
    let claimers = views::user_names(db, claims.iter().map(|c| c.claimer_id)).await?;

    Ok(claims
        .into_iter()
        .map(|c| {
            let item = items.get(&c.item_id);
            PendingClaimRow {
                claim_id: c.id,
                item_id: c.item_id,
                title: item.map(|i| i.title.clone()),
                claimer_id: c.claimer_id,
                claimer_name: claimers.get(&c.claimer_id).cloned(),
                claimed_on: c.claimed_on,
                current_status: item.map(|i| i.current_status),
            }
        })
        .collect())
}
