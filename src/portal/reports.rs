//! Lost/found reports

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;

use super::access::ensure_owner_or_admin;
use super::items::{insert_item, NewItem};
use super::lifecycle::force_item_status;
use super::lookups::find_or_create_location;
use super::views::ReportView;
use super::Page;
use crate::db::entities::status::{ItemStatus, ReportStatus, ReportType};
use crate::db::entities::{item, location, report, user};
use crate::error::{Result, ServerError};

#[derive(Debug, Deserialize)]
pub struct NewReport {
    pub item_id: Option<i32>,
    pub item_title: Option<String>,
    pub report_type: ReportType,
    pub location_id: Option<i32>,
    pub location_name: Option<String>,
    pub reported_date: Option<NaiveDate>,
    pub details: Option<String>,
    #[serde(default = "default_status")]
    pub status: ReportStatus,
}

fn default_status() -> ReportStatus {
    ReportStatus::Open
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct ReportFilter {
    pub report_type: Option<ReportType>,
    pub status: Option<ReportStatus>,
}

/// Pick the item a new report refers to: an existing item by id, otherwise
/// a fresh item synthesized from the supplied title.
async fn resolve_item<C: ConnectionTrait>(db: &C, actor: &user::Model, new_report: &NewReport) -> Result<item::Model> {
    if let Some(id) = new_report.item_id {
        if let Some(existing) = item::Entity::find_by_id(id).one(db).await? {
            return Ok(existing);
        }
    }

    match new_report.item_title.as_deref() {
        Some(title) if title.trim().is_empty() => {
            Err(ServerError::Validation("Item title is required".to_string()))
        }
        Some(title) => {
            let synthesized = NewItem {
                title: title.to_string(),
                category_id: None,
                description: new_report.details.clone(),
                current_status: new_report.report_type.initial_item_status(),
            };
            insert_item(db, actor.id, synthesized).await
        }
        None => Err(ServerError::NotFound("Item")),
    }
}

async fn resolve_location<C: ConnectionTrait>(db: &C, new_report: &NewReport) -> Result<Option<i32>> {
    if let Some(id) = new_report.location_id {
        return match location::Entity::find_by_id(id).one(db).await? {
            Some(loc) => Ok(Some(loc.id)),
            None => Err(ServerError::NotFound("Location")),
        };
    }
    match new_report.location_name.as_deref() {
        Some(name) => Ok(find_or_create_location(db, name).await?.map(|loc| loc.id)),
        None => Ok(None),
    }
}

/// File a report. The item and location may be created on the fly; those
/// steps are not atomic with the report insert.
pub async fn create_report(db: &DatabaseConnection, actor: &user::Model, new_report: NewReport) -> Result<ReportView> {
    let target = resolve_item(db, actor, &new_report).await?;
    let location_id = resolve_location(db, &new_report).await?;

    let txn = db.begin().await?;
    let created = report::ActiveModel {
        item_id: Set(target.id),
        reporter_id: Set(actor.id),
        report_type: Set(new_report.report_type),
        location_id: Set(location_id),
        reported_date: Set(new_report.reported_date),
        reported_on: Set(Utc::now()),
        details: Set(new_report.details),
        status: Set(new_report.status),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    if created.status == ReportStatus::Resolved {
        force_item_status(&txn, target.id, ItemStatus::Completed, Utc::now()).await?;
    }
    txn.commit().await?;

    tracing::info!(
        "User {} filed {:?} report {} for item {}",
        actor.id,
        created.report_type,
        created.id,
        target.id
    );
    ReportView::one(db, created).await
}

pub async fn list_reports<C: ConnectionTrait>(db: &C, filter: ReportFilter, page: Page) -> Result<Vec<ReportView>> {
    let mut query = report::Entity::find().order_by_asc(report::Column::Id);
    if let Some(report_type) = filter.report_type {
        query = query.filter(report::Column::ReportType.eq(report_type));
    }
    if let Some(status) = filter.status {
        query = query.filter(report::Column::Status.eq(status));
    }
    let rows = query.offset(page.skip).limit(page.limit).all(db).await?;
    ReportView::assemble(db, rows).await
}

async fn load_report<C: ConnectionTrait>(db: &C, report_id: i32) -> Result<report::Model> {
    report::Entity::find_by_id(report_id)
        .one(db)
        .await?
        .ok_or(ServerError::NotFound("Report"))
}

pub async fn get_report<C: ConnectionTrait>(db: &C, report_id: i32) -> Result<ReportView> {
    let row = load_report(db, report_id).await?;
    ReportView::one(db, row).await
}

/// Reporter or admin sets any report status. Resolving completes the item in
/// the same transaction.
pub async fn set_report_status(
    db: &DatabaseConnection,
    actor: &user::Model,
    report_id: i32,
    status: ReportStatus,
) -> Result<ReportView> {
    let txn = db.begin().await?;
    let row = load_report(&txn, report_id).await?;
    ensure_owner_or_admin(actor, row.reporter_id)?;
    let item_id = row.item_id;

    let mut active: report::ActiveModel = row.into();
    active.status = Set(status);
    let updated = active.update(&txn).await?;

    if status == ReportStatus::Resolved {
        force_item_status(&txn, item_id, ItemStatus::Completed, Utc::now()).await?;
    }
    txn.commit().await?;

    tracing::info!("User {} set report {} to {:?}", actor.id, report_id, status);
    ReportView::one(db, updated).await
}
