//! Initial schema: clients, payables, payments.
//!
//! Invoices and fee notes share the payables table, tagged by `kind`.
//! Payments cascade-delete with their payable.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS payables CASCADE;
DROP TABLE IF EXISTS clients CASCADE;
DROP TYPE IF EXISTS payable_status;
DROP TYPE IF EXISTS payable_kind;
",
        )
        .await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r"
CREATE TYPE payable_kind AS ENUM ('invoice', 'fee_note');
CREATE TYPE payable_status AS ENUM ('pending', 'partially_paid', 'paid');

-- Clients (owners of payables, referenced by tax id)
CREATE TABLE clients (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tax_id VARCHAR(20) NOT NULL UNIQUE,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    email TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Payables: invoices and fee notes in one table, tagged by kind.
-- client_tax_id is deliberately not a foreign key: payables outlive their
-- client and surface a null owner name instead of failing.
CREATE TABLE payables (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    kind payable_kind NOT NULL,
    number VARCHAR(50),
    client_tax_id VARCHAR(20) NOT NULL,
    issue_date DATE NOT NULL,
    paid_date TIMESTAMPTZ,
    status payable_status NOT NULL DEFAULT 'pending',
    amount NUMERIC(19, 4) NOT NULL,
    total_paid NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_amount_non_negative CHECK (amount >= 0),
    CONSTRAINT chk_total_paid_range CHECK (total_paid >= 0 AND total_paid <= amount),
    CONSTRAINT chk_invoice_has_number CHECK (kind <> 'invoice' OR number IS NOT NULL)
);

-- Invoice numbers are unique per kind (fee notes carry no number)
CREATE UNIQUE INDEX idx_payables_number ON payables(kind, number) WHERE number IS NOT NULL;

CREATE INDEX idx_payables_client ON payables(client_tax_id);
CREATE INDEX idx_payables_status_paid_date ON payables(status, paid_date);
CREATE INDEX idx_payables_issue_date ON payables(kind, issue_date);

-- Payments against a payable
CREATE TABLE payments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    payable_id UUID NOT NULL REFERENCES payables(id) ON DELETE CASCADE,
    amount NUMERIC(19, 4) NOT NULL,
    paid_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    note TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_payment_positive CHECK (amount > 0)
);

CREATE INDEX idx_payments_payable ON payments(payable_id, paid_at DESC);
";
