//! Ownership claim entity
//!
//! A claim starts `pending` and is decided once by an admin. `decided_by` and
//! `decided_on` are set together when the decision is recorded.

use sea_orm::entity::prelude::*;

use super::status::ClaimStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "claim")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub item_id: i32,
    pub claimer_id: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub claim_text: Option<String>,
    pub claim_status: ClaimStatus,
    pub claimed_on: DateTimeUtc,
    pub decided_by: Option<i32>,
    pub decided_on: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_delete = "Cascade"
    )]
    Item,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ClaimerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Claimer,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DecidedBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Decider,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
