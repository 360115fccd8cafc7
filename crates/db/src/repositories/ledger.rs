//! Cash ledger repository backed by `SeaORM`.
//!
//! Every mutation is a single statement or a single transaction, guarded by
//! the row's `status` and `entry_count` so that concurrent writers from any
//! number of processes observe the lifecycle invariants:
//!
//! - opening relies on the partial unique index
//!   `uq_cash_sessions_open_operator`
//! - appends bump `entry_count` conditionally and insert the entry in the
//!   same transaction
//! - closes update `status` only if `entry_count` still matches the entry
//!   set the totals were computed from

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, SqlErr, TransactionTrait,
};
use tracing::{debug, warn};

use caixa_core::cash::{
    CashSession, EntryFilter, EntryStore, LedgerEntry, SessionClosing, SessionStatus,
    SessionStore, StoreError, StoreResult,
};
use caixa_shared::types::{CashSessionId, OperatorId};

use super::mapping::{
    encode_by_method, entry_from_model, new_entry_model, new_session_model, session_from_model,
    to_db_count,
};
use crate::entities::{cash_sessions, ledger_entries};

/// Maps driver failures to transient store errors.
fn unavailable(err: DbErr) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Cash ledger repository for sessions and entries.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Explains why a conditional update on `session_id` touched no row.
    async fn diagnose<C: ConnectionTrait>(
        conn: &C,
        session_id: CashSessionId,
        expected: u64,
    ) -> StoreError {
        match cash_sessions::Entity::find_by_id(session_id.into_inner())
            .one(conn)
            .await
        {
            Err(err) => unavailable(err),
            Ok(None) => StoreError::SessionNotFound(session_id),
            Ok(Some(row)) if row.status != SessionStatus::Open.as_str() => {
                StoreError::SessionNotOpen(session_id)
            }
            Ok(Some(row)) => StoreError::VersionMismatch {
                session_id,
                expected,
                actual: u64::try_from(row.entry_count).unwrap_or_default(),
            },
        }
    }
}

#[async_trait]
impl SessionStore for LedgerRepository {
    async fn insert_open(&self, session: &CashSession) -> StoreResult<()> {
        let model = new_session_model(session)?;
        match cash_sessions::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                debug!(operator_id = %session.operator_id, "open session index rejected insert");
                Err(StoreError::OpenSessionExists(session.operator_id))
            }
            Err(err) => Err(unavailable(err)),
        }
    }

    async fn find_session(&self, id: CashSessionId) -> StoreResult<Option<CashSession>> {
        cash_sessions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(unavailable)?
            .map(session_from_model)
            .transpose()
    }

    async fn find_open_session(
        &self,
        operator_id: OperatorId,
    ) -> StoreResult<Option<CashSession>> {
        cash_sessions::Entity::find()
            .filter(cash_sessions::Column::OperatorId.eq(operator_id.into_inner()))
            .filter(cash_sessions::Column::Status.eq(SessionStatus::Open.as_str()))
            .one(&self.db)
            .await
            .map_err(unavailable)?
            .map(session_from_model)
            .transpose()
    }

    async fn list_sessions(&self, operator_id: OperatorId) -> StoreResult<Vec<CashSession>> {
        cash_sessions::Entity::find()
            .filter(cash_sessions::Column::OperatorId.eq(operator_id.into_inner()))
            .order_by_desc(cash_sessions::Column::OpenedAt)
            .order_by_desc(cash_sessions::Column::Id)
            .all(&self.db)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(session_from_model)
            .collect()
    }

    async fn close_session(&self, closing: &SessionClosing) -> StoreResult<CashSession> {
        let session_id = closing.session_id;
        let by_method = encode_by_method(&closing.totals.by_method)?;
        let txn = self.db.begin().await.map_err(unavailable)?;

        let result = cash_sessions::Entity::update_many()
            .col_expr(
                cash_sessions::Column::Status,
                Expr::value(SessionStatus::Closed.as_str()),
            )
            .col_expr(
                cash_sessions::Column::ClosedAt,
                Expr::value(closing.closed_at.fixed_offset()),
            )
            .col_expr(
                cash_sessions::Column::ClosingNote,
                Expr::value(closing.closing_note.clone()),
            )
            .col_expr(
                cash_sessions::Column::TotalInflow,
                Expr::value(closing.totals.total_inflow.minor()),
            )
            .col_expr(
                cash_sessions::Column::TotalOutflow,
                Expr::value(closing.totals.total_outflow.minor()),
            )
            .col_expr(
                cash_sessions::Column::ClosingBalance,
                Expr::value(closing.totals.closing_balance.minor()),
            )
            .col_expr(cash_sessions::Column::TotalsByMethod, Expr::value(by_method))
            .filter(cash_sessions::Column::Id.eq(session_id.into_inner()))
            .filter(cash_sessions::Column::Status.eq(SessionStatus::Open.as_str()))
            .filter(cash_sessions::Column::EntryCount.eq(to_db_count(closing.expected_entry_count)?))
            .exec(&txn)
            .await
            .map_err(unavailable)?;

        if result.rows_affected == 0 {
            let err = Self::diagnose(&txn, session_id, closing.expected_entry_count).await;
            warn!(%session_id, error = %err, "conditional close matched no row");
            return Err(err);
        }

        let row = cash_sessions::Entity::find_by_id(session_id.into_inner())
            .one(&txn)
            .await
            .map_err(unavailable)?
            .ok_or(StoreError::SessionNotFound(session_id))?;
        txn.commit().await.map_err(unavailable)?;

        session_from_model(row)
    }
}

#[async_trait]
impl EntryStore for LedgerRepository {
    async fn append_entry(&self, entry: &LedgerEntry) -> StoreResult<()> {
        let session_id = entry.session_id;
        let expected = entry.sequence.saturating_sub(1);
        let model = new_entry_model(entry)?;
        let txn = self.db.begin().await.map_err(unavailable)?;

        let result = cash_sessions::Entity::update_many()
            .col_expr(
                cash_sessions::Column::EntryCount,
                Expr::col(cash_sessions::Column::EntryCount).add(1),
            )
            .filter(cash_sessions::Column::Id.eq(session_id.into_inner()))
            .filter(cash_sessions::Column::Status.eq(SessionStatus::Open.as_str()))
            .filter(cash_sessions::Column::EntryCount.eq(to_db_count(expected)?))
            .exec(&txn)
            .await
            .map_err(unavailable)?;

        if result.rows_affected == 0 {
            return Err(Self::diagnose(&txn, session_id, expected).await);
        }

        ledger_entries::Entity::insert(model)
            .exec_without_returning(&txn)
            .await
            .map_err(unavailable)?;
        txn.commit().await.map_err(unavailable)?;

        Ok(())
    }

    async fn list_entries(
        &self,
        session_id: CashSessionId,
        filter: &EntryFilter,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let mut query = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::SessionId.eq(session_id.into_inner()));
        if let Some(category) = filter.category {
            query = query.filter(ledger_entries::Column::Category.eq(category.as_str()));
        }
        if let Some(method) = filter.payment_method {
            query = query.filter(ledger_entries::Column::PaymentMethod.eq(method.as_str()));
        }

        let rows = query
            .order_by_asc(ledger_entries::Column::Sequence)
            .all(&self.db)
            .await
            .map_err(unavailable)?;

        // Time bounds are applied after decoding; SQLite compares timestamps as text.
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = entry_from_model(row)?;
            if filter.matches(&entry) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
