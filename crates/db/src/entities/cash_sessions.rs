//! `SeaORM` Entity for cash_sessions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub operator_id: Uuid,
    pub status: String,
    pub opening_float: i64,
    pub opening_note: Option<String>,
    pub opened_at: DateTimeWithTimeZone,
    pub entry_count: i64,
    pub closed_at: Option<DateTimeWithTimeZone>,
    pub closing_note: Option<String>,
    pub total_inflow: Option<i64>,
    pub total_outflow: Option<i64>,
    pub closing_balance: Option<i64>,
    /// JSON array of per-method totals, set on close.
    pub totals_by_method: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger_entries::Entity")]
    LedgerEntries,
}

impl Related<super::ledger_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
