//! Enumerated column values shared by the portal entities.
//!
//! String-backed enums are stored as short VARCHAR columns so the same schema
//! works on MySQL and SQLite. Unknown values fail deserialization at the HTTP
//! boundary before they can reach the database.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Portal role. Persisted as the fixed small-integer `role_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(num_value = 1)]
    Student,
    #[sea_orm(num_value = 2)]
    Staff,
    #[sea_orm(num_value = 3)]
    Admin,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[sea_orm(string_value = "lost")]
    Lost,
    #[sea_orm(string_value = "found")]
    Found,
    #[sea_orm(string_value = "claimed")]
    Claimed,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "discarded")]
    Discarded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[sea_orm(string_value = "lost")]
    Lost,
    #[sea_orm(string_value = "found")]
    Found,
}

impl ReportType {
    /// Status given to an item synthesized from a report of this type.
    pub fn initial_item_status(self) -> ItemStatus {
        match self {
            ReportType::Lost => ItemStatus::Lost,
            ReportType::Found => ItemStatus::Found,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "in_review")]
    InReview,
    #[sea_orm(string_value = "resolved")]
    Resolved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}
