//! Response projections: entity rows joined with their display fields.
//!
//! Every list projection loads related names in one batched query per
//! relation rather than once per row.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::db::entities::status::{ClaimStatus, ItemStatus, ReportStatus, ReportType};
use crate::db::entities::{category, claim, item, item_image, location, report, user};
use crate::error::Result;

#[derive(Clone, Debug, Serialize)]
pub struct UserView {
    pub user_id: i32,
    pub name: String,
    pub branch: Option<String>,
    pub roll_number: String,
    pub school: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role_id: i16,
    pub role_name: &'static str,
    pub created_at: DateTime<Utc>,
}

impl From<&user::Model> for UserView {
    fn from(u: &user::Model) -> Self {
        Self {
            user_id: u.id,
            name: u.name.clone(),
            branch: u.branch.clone(),
            roll_number: u.roll_number.clone(),
            school: u.school.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            role_id: sea_orm::ActiveEnum::to_value(&u.role),
            role_name: u.role.name(),
            created_at: u.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CategoryView {
    pub category_id: i32,
    pub category_name: String,
}

impl From<category::Model> for CategoryView {
    fn from(c: category::Model) -> Self {
        Self {
            category_id: c.id,
            category_name: c.name,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct LocationView {
    pub location_id: i32,
    pub location_name: String,
    pub building: Option<String>,
    pub floor: Option<String>,
}

impl From<location::Model> for LocationView {
    fn from(l: location::Model) -> Self {
        Self {
            location_id: l.id,
            location_name: l.name,
            building: l.building,
            floor: l.floor,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ImageView {
    pub image_id: i32,
    pub item_id: i32,
    pub file_path: String,
    pub uploaded_on: DateTime<Utc>,
}

impl From<item_image::Model> for ImageView {
    fn from(i: item_image::Model) -> Self {
        Self {
            image_id: i.id,
            item_id: i.item_id,
            file_path: i.file_path,
            uploaded_on: i.uploaded_on,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ItemView {
    pub item_id: i32,
    pub title: String,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    pub created_by: i32,
    pub created_on: DateTime<Utc>,
    pub current_status: ItemStatus,
    pub last_status_change: Option<DateTime<Utc>>,
    pub creator_name: Option<String>,
    pub category_name: Option<String>,
    pub images: Vec<ImageView>,
    /// Summary of the most recent report; only filled for single-item reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report_type: Option<ReportType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_location_name: Option<String>,
}

impl ItemView {
    pub async fn assemble<C: ConnectionTrait>(db: &C, items: Vec<item::Model>) -> Result<Vec<Self>> {
        let creators = user_names(db, items.iter().map(|i| i.created_by)).await?;
        let categories = category_names(db, items.iter().filter_map(|i| i.category_id)).await?;
        let mut images = images_by_item(db, items.iter().map(|i| i.id)).await?;

        Ok(items
            .into_iter()
            .map(|i| Self {
                creator_name: creators.get(&i.created_by).cloned(),
                category_name: i.category_id.and_then(|id| categories.get(&id).cloned()),
                images: images.remove(&i.id).unwrap_or_default(),
                item_id: i.id,
                title: i.title,
                category_id: i.category_id,
                description: i.description,
                created_by: i.created_by,
                created_on: i.created_on,
                current_status: i.current_status,
                last_status_change: i.last_status_change,
                last_report_type: None,
                last_report_date: None,
                last_location_name: None,
            })
            .collect())
    }

    pub async fn one<C: ConnectionTrait>(db: &C, item: item::Model) -> Result<Self> {
        Ok(Self::assemble(db, vec![item]).await?.remove(0))
    }

    /// Single-item projection including the latest report summary
    pub async fn detail<C: ConnectionTrait>(db: &C, item: item::Model) -> Result<Self> {
        let last_report = report::Entity::find()
            .filter(report::Column::ItemId.eq(item.id))
            .order_by_desc(report::Column::ReportedOn)
            .order_by_desc(report::Column::Id)
            .one(db)
            .await?;

        let mut view = Self::one(db, item).await?;
        if let Some(last) = last_report {
            view.last_report_type = Some(last.report_type);
            view.last_report_date = last.reported_date;
            if let Some(location_id) = last.location_id {
                view.last_location_name = location::Entity::find_by_id(location_id)
                    .one(db)
                    .await?
                    .map(|l| l.name);
            }
        }
        Ok(view)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportView {
    pub report_id: i32,
    pub item_id: i32,
    pub reporter_id: i32,
    pub report_type: ReportType,
    pub location_id: Option<i32>,
    pub reported_date: Option<NaiveDate>,
    pub reported_on: DateTime<Utc>,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub reporter_name: Option<String>,
    pub item_title: Option<String>,
    pub location_name: Option<String>,
}

impl ReportView {
    pub async fn assemble<C: ConnectionTrait>(db: &C, reports: Vec<report::Model>) -> Result<Vec<Self>> {
        let reporters = user_names(db, reports.iter().map(|r| r.reporter_id)).await?;
        let titles = item_titles(db, reports.iter().map(|r| r.item_id)).await?;
        let locations = location_names(db, reports.iter().filter_map(|r| r.location_id)).await?;

        Ok(reports
            .into_iter()
            .map(|r| Self {
                reporter_name: reporters.get(&r.reporter_id).cloned(),
                item_title: titles.get(&r.item_id).cloned(),
                location_name: r.location_id.and_then(|id| locations.get(&id).cloned()),
                report_id: r.id,
                item_id: r.item_id,
                reporter_id: r.reporter_id,
                report_type: r.report_type,
                location_id: r.location_id,
                reported_date: r.reported_date,
                reported_on: r.reported_on,
                details: r.details,
                status: r.status,
            })
            .collect())
    }

    pub async fn one<C: ConnectionTrait>(db: &C, report: report::Model) -> Result<Self> {
        Ok(Self::assemble(db, vec![report]).await?.remove(0))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ClaimView {
    pub claim_id: i32,
    pub item_id: i32,
    pub claimer_id: i32,
    pub claim_text: Option<String>,
    pub claim_status: ClaimStatus,
    pub claimed_on: DateTime<Utc>,
    pub decided_by: Option<i32>,
    pub decided_on: Option<DateTime<Utc>>,
    pub item_title: Option<String>,
    pub claimer_name: Option<String>,
    pub decider_name: Option<String>,
}

impl ClaimView {
    pub async fn assemble<C: ConnectionTrait>(db: &C, claims: Vec<claim::Model>) -> Result<Vec<Self>> {
        let people = user_names(
            db,
            claims
                .iter()
                .flat_map(|c| std::iter::once(c.claimer_id).chain(c.decided_by)),
        )
        .await?;
        let titles = item_titles(db, claims.iter().map(|c| c.item_id)).await?;

        Ok(claims
            .into_iter()
            .map(|c| Self {
                item_title: titles.get(&c.item_id).cloned(),
                claimer_name: people.get(&c.claimer_id).cloned(),
                decider_name: c.decided_by.and_then(|id| people.get(&id).cloned()),
                claim_id: c.id,
                item_id: c.item_id,
                claimer_id: c.claimer_id,
                claim_text: c.claim_text,
                claim_status: c.claim_status,
                claimed_on: c.claimed_on,
                decided_by: c.decided_by,
                decided_on: c.decided_on,
            })
            .collect())
    }

    pub async fn one<C: ConnectionTrait>(db: &C, claim: claim::Model) -> Result<Self> {
        Ok(Self::assemble(db, vec![claim]).await?.remove(0))
    }
}

/// One row of a student's own report history
#[derive(Clone, Debug, Serialize)]
pub struct StudentReportRow {
    pub report_id: i32,
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub details: Option<String>,
    pub reported_on: DateTime<Utc>,
    pub item_id: i32,
    pub item_title: Option<String>,
    pub current_status: Option<ItemStatus>,
    pub location_name: Option<String>,
}

/// One row of the admin queue of undecided claims
#[derive(Clone, Debug, Serialize)]
pub struct PendingClaimRow {
    pub claim_id: i32,
    pub item_id: i32,
    pub title: Option<String>,
    pub claimer_id: i32,
    pub claimer_name: Option<String>,
    pub claimed_on: DateTime<Utc>,
    pub current_status: Option<ItemStatus>,
}

fn unique_ids(ids: impl IntoIterator<Item = i32>) -> Vec<i32> {
    ids.into_iter().collect::<HashSet<_>>().into_iter().collect()
}

pub(crate) async fn user_names<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect())
}

pub(crate) async fn items_by_id<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, item::Model>> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(item::Entity::find()
        .filter(item::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect())
}

async fn item_titles<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>> {
    Ok(items_by_id(db, ids)
        .await?
        .into_iter()
        .map(|(id, i)| (id, i.title))
        .collect())
}

async fn category_names<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(category::Entity::find()
        .filter(category::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect())
}

pub(crate) async fn location_names<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>> {
    let ids = unique_ids(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(location::Entity::find()
        .filter(location::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|l| (l.id, l.name))
        .collect())
}

async fn images_by_item<C: ConnectionTrait>(
    db: &C,
    item_ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, Vec<ImageView>>> {
    let ids = unique_ids(item_ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = item_image::Entity::find()
        .filter(item_image::Column::ItemId.is_in(ids))
        .order_by_asc(item_image::Column::Id)
        .all(db)
        .await?;

    let mut grouped: HashMap<i32, Vec<ImageView>> = HashMap::new();
    for row in rows {
        grouped.entry(row.item_id).or_default().push(row.into());
    }
    Ok(grouped)
}
