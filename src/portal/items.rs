//! Items and their photos

use bytes::Bytes;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;

use super::access::{ensure_owner_or_admin, require_role};
use super::lifecycle::{check_initial_status, force_item_status, is_terminal, sources_of, transition_item};
use super::views::{ImageView, ItemView};
use super::Page;
use crate::db::entities::status::{ItemStatus, Role};
use crate::db::entities::{category, item, item_image, user};
use crate::error::{Result, ServerError};
use crate::storage::{key_from_public_path, public_path, upload_key, StorageBackend};

#[derive(Debug, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub current_status: ItemStatus,
}

fn default_status() -> ItemStatus {
    ItemStatus::Lost
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    pub current_status: Option<ItemStatus>,
}

pub(crate) async fn load_item<C: ConnectionTrait>(db: &C, item_id: i32) -> Result<item::Model> {
    item::Entity::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(ServerError::NotFound("Item"))
}

fn clean_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServerError::Validation("Item title must not be blank".to_string()));
    }
    Ok(title.to_string())
}

async fn ensure_category<C: ConnectionTrait>(db: &C, category_id: Option<i32>) -> Result<()> {
    if let Some(id) = category_id {
        if category::Entity::find_by_id(id).one(db).await?.is_none() {
            return Err(ServerError::Validation(format!("Category {} does not exist", id)));
        }
    }
    Ok(())
}

async fn ensure_title_free<C: ConnectionTrait>(db: &C, title: &str, creator: i32, except: Option<i32>) -> Result<()> {
    let mut query = item::Entity::find()
        .filter(item::Column::Title.eq(title))
        .filter(item::Column::CreatedBy.eq(creator));
    if let Some(id) = except {
        query = query.filter(item::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(ServerError::Conflict(format!("You already have an item titled '{}'", title)));
    }
    Ok(())
}

/// Insert an item row owned by `creator_id`
pub(crate) async fn insert_item<C: ConnectionTrait>(db: &C, creator_id: i32, new_item: NewItem) -> Result<item::Model> {
    check_initial_status(new_item.current_status)?;
    let title = clean_title(&new_item.title)?;
    ensure_category(db, new_item.category_id).await?;
    ensure_title_free(db, &title, creator_id, None).await?;

    let created = item::ActiveModel {
        title: Set(title),
        category_id: Set(new_item.category_id),
        description: Set(new_item.description),
        created_by: Set(creator_id),
        created_on: Set(Utc::now()),
        current_status: Set(new_item.current_status),
        last_status_change: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!("User {} created item {} ({})", creator_id, created.id, created.title);
    Ok(created)
}

pub async fn create_item<C: ConnectionTrait>(db: &C, actor: &user::Model, new_item: NewItem) -> Result<ItemView> {
    let created = insert_item(db, actor.id, new_item).await?;
    ItemView::one(db, created).await
}

pub async fn list_items<C: ConnectionTrait>(db: &C, status: Option<ItemStatus>, page: Page) -> Result<Vec<ItemView>> {
    let mut query = item::Entity::find().order_by_asc(item::Column::Id);
    if let Some(status) = status {
        query = query.filter(item::Column::CurrentStatus.eq(status));
    }
    let rows = query.offset(page.skip).limit(page.limit).all(db).await?;
    ItemView::assemble(db, rows).await
}

pub async fn get_item<C: ConnectionTrait>(db: &C, item_id: i32) -> Result<ItemView> {
    let row = load_item(db, item_id).await?;
    ItemView::detail(db, row).await
}

/// Owner or admin edit. A status change must follow the transition table.
///
/// Field edits and the status change commit together or not at all.
pub async fn update_item(
    db: &DatabaseConnection,
    actor: &user::Model,
    item_id: i32,
    update: ItemUpdate,
) -> Result<ItemView> {
    let txn = db.begin().await?;
    let current = load_item(&txn, item_id).await?;
    ensure_owner_or_admin(actor, current.created_by)?;

    let mut active: item::ActiveModel = current.clone().into();
    let mut dirty = false;
    if let Some(title) = update.title.as_deref() {
        let title = clean_title(title)?;
        if title != current.title {
            ensure_title_free(&txn, &title, current.created_by, Some(current.id)).await?;
            active.title = Set(title);
            dirty = true;
        }
    }
    if update.category_id.is_some() && update.category_id != current.category_id {
        ensure_category(&txn, update.category_id).await?;
        active.category_id = Set(update.category_id);
        dirty = true;
    }
    if update.description.is_some() && update.description != current.description {
        active.description = Set(update.description);
        dirty = true;
    }
    if dirty {
        active.update(&txn).await?;
    }

    if let Some(to) = update.current_status {
        if to != current.current_status {
            transition_item(&txn, item_id, &sources_of(to), to, Utc::now()).await?;
            tracing::info!("Item {} moved to {:?} by user {}", item_id, to, actor.id);
        }
    }
    txn.commit().await?;

    get_item(db, item_id).await
}

/// Admin override: assign any status
pub async fn force_status<C: ConnectionTrait>(
    db: &C,
    actor: &user::Model,
    item_id: i32,
    to: ItemStatus,
) -> Result<ItemView> {
    require_role(actor, Role::Admin)?;
    let current = load_item(db, item_id).await?;
    force_item_status(db, item_id, to, Utc::now()).await?;
    if is_terminal(current.current_status) && !is_terminal(to) {
        tracing::warn!("Admin {} reopened item {} ({:?} -> {:?})", actor.id, item_id, current.current_status, to);
    } else {
        tracing::info!("Admin {} forced item {} to {:?}", actor.id, item_id, to);
    }
    get_item(db, item_id).await
}

/// Delete an item with its reports, claims and image rows. Returns the public
/// paths of the removed images so their files can be cleaned up.
pub async fn delete_item<C: ConnectionTrait>(db: &C, actor: &user::Model, item_id: i32) -> Result<Vec<String>> {
    let row = load_item(db, item_id).await?;
    ensure_owner_or_admin(actor, row.created_by)?;

    let paths: Vec<String> = item_image::Entity::find()
        .filter(item_image::Column::ItemId.eq(item_id))
        .all(db)
        .await?
        .into_iter()
        .map(|img| img.file_path)
        .collect();

    row.delete(db).await?;
    tracing::info!("User {} deleted item {}", actor.id, item_id);
    Ok(paths)
}

/// Remove stored files for the given public paths, logging failures
pub async fn remove_image_files(store: &dyn StorageBackend, paths: &[String]) {
    for path in paths {
        let Some(key) = key_from_public_path(path) else {
            continue;
        };
        if let Err(e) = store.delete(key).await {
            tracing::warn!("Failed to remove upload {}: {}", key, e);
        }
    }
}

/// Store an uploaded photo and attach it to an item (owner or admin)
pub async fn attach_image<C: ConnectionTrait>(
    db: &C,
    store: &dyn StorageBackend,
    actor: &user::Model,
    item_id: i32,
    original_name: Option<&str>,
    data: Bytes,
) -> Result<ImageView> {
    let row = load_item(db, item_id).await?;
    ensure_owner_or_admin(actor, row.created_by)?;
    if data.is_empty() {
        return Err(ServerError::Validation("Uploaded file is empty".to_string()));
    }

    let key = upload_key(original_name);
    store.put(&key, data).await?;

    let inserted = item_image::ActiveModel {
        item_id: Set(item_id),
        file_path: Set(public_path(&key)),
        uploaded_on: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await;

    match inserted {
        Ok(image) => {
            tracing::info!("Stored image {} for item {}", key, item_id);
            Ok(image.into())
        }
        Err(e) => {
            if let Err(cleanup) = store.delete(&key).await {
                tracing::warn!("Failed to remove orphaned upload {}: {}", key, cleanup);
            }
            Err(e.into())
        }
    }
}
