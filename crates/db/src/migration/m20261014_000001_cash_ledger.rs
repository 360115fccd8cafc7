//! Cash sessions and their append-only ledger.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(CASH_SESSIONS_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS ledger_entries;")
            .await?;
        db.execute_unprepared("DROP TABLE IF EXISTS cash_sessions;")
            .await?;
        Ok(())
    }
}

const CASH_SESSIONS_SQL: &str = r"
CREATE TABLE cash_sessions (
    id UUID PRIMARY KEY,
    operator_id UUID NOT NULL,
    status VARCHAR(16) NOT NULL,
    opening_float BIGINT NOT NULL,
    opening_note TEXT,
    opened_at TIMESTAMPTZ NOT NULL,
    entry_count BIGINT NOT NULL DEFAULT 0,
    closed_at TIMESTAMPTZ,
    closing_note TEXT,
    total_inflow BIGINT,
    total_outflow BIGINT,
    closing_balance BIGINT,
    totals_by_method TEXT,
    CONSTRAINT chk_cash_sessions_status CHECK (status IN ('open', 'closed')),
    CONSTRAINT chk_cash_sessions_float CHECK (opening_float >= 0),
    CONSTRAINT chk_cash_sessions_closed CHECK (
        (status = 'open' AND closed_at IS NULL AND closing_balance IS NULL)
        OR (status = 'closed' AND closed_at IS NOT NULL AND closing_balance IS NOT NULL)
    )
);

-- At most one open session per operator
CREATE UNIQUE INDEX uq_cash_sessions_open_operator ON cash_sessions (operator_id) WHERE status = 'open';

-- Operator history, newest first
CREATE INDEX idx_cash_sessions_operator ON cash_sessions (operator_id, opened_at DESC);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    session_id UUID NOT NULL REFERENCES cash_sessions(id),
    sequence BIGINT NOT NULL,
    category VARCHAR(32) NOT NULL,
    amount BIGINT NOT NULL,
    payment_method VARCHAR(16) NOT NULL,
    description TEXT,
    linked_customer_id UUID,
    linked_product_id UUID,
    created_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT chk_ledger_entries_amount CHECK (amount > 0),
    CONSTRAINT chk_ledger_entries_category CHECK (category IN ('inflow_payment', 'inflow_sale', 'outflow')),
    CONSTRAINT uq_ledger_entries_sequence UNIQUE (session_id, sequence)
);
";
