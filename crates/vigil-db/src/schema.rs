//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. The audit and security ledgers
//! are append-only by convention: no code path issues UPDATE against
//! them.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — audit trail, incident ledger, compliance reports
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Audit events (append-only)
-- =======================================================================
DEFINE TABLE audit_event SCHEMAFULL;
DEFINE FIELD action ON TABLE audit_event TYPE string;
DEFINE FIELD resource ON TABLE audit_event TYPE string;
DEFINE FIELD resource_id ON TABLE audit_event TYPE option<string>;
DEFINE FIELD user_id ON TABLE audit_event TYPE option<string>;
DEFINE FIELD organization_id ON TABLE audit_event TYPE option<string>;
DEFINE FIELD session_id ON TABLE audit_event TYPE option<string>;
DEFINE FIELD ip_address ON TABLE audit_event TYPE option<string>;
DEFINE FIELD user_agent ON TABLE audit_event TYPE option<string>;
DEFINE FIELD endpoint ON TABLE audit_event TYPE option<string>;
DEFINE FIELD method ON TABLE audit_event TYPE option<string>;
DEFINE FIELD success ON TABLE audit_event TYPE bool DEFAULT true;
DEFINE FIELD error_code ON TABLE audit_event TYPE option<string>;
DEFINE FIELD error_message ON TABLE audit_event TYPE option<string>;
DEFINE FIELD metadata ON TABLE audit_event TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD risk_score ON TABLE audit_event TYPE int DEFAULT 0 \
    ASSERT $value >= 0 AND $value <= 100;
DEFINE FIELD anomaly_flags ON TABLE audit_event TYPE array<string> \
    DEFAULT [];
DEFINE FIELD compliance_flags ON TABLE audit_event TYPE array<string> \
    DEFAULT [];
DEFINE FIELD retention_until ON TABLE audit_event TYPE datetime;
DEFINE FIELD timestamp ON TABLE audit_event TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_user_ts ON TABLE audit_event \
    COLUMNS user_id, timestamp;
DEFINE INDEX idx_audit_org_ts ON TABLE audit_event \
    COLUMNS organization_id, timestamp;
DEFINE INDEX idx_audit_action ON TABLE audit_event COLUMNS action;

-- =======================================================================
-- Security events (detected incidents)
-- =======================================================================
DEFINE TABLE security_event SCHEMAFULL;
DEFINE FIELD event_type ON TABLE security_event TYPE string;
DEFINE FIELD severity ON TABLE security_event TYPE string \
    ASSERT $value IN ['Low', 'Medium', 'High', 'Critical'];
DEFINE FIELD category ON TABLE security_event TYPE string \
    ASSERT $value IN ['Authentication', 'Authorization', 'DataAccess', \
    'System'];
DEFINE FIELD title ON TABLE security_event TYPE string;
DEFINE FIELD description ON TABLE security_event TYPE option<string>;
DEFINE FIELD user_id ON TABLE security_event TYPE option<string>;
DEFINE FIELD organization_id ON TABLE security_event TYPE option<string>;
DEFINE FIELD detected_by ON TABLE security_event TYPE string;
DEFINE FIELD risk_score ON TABLE security_event TYPE int DEFAULT 0 \
    ASSERT $value >= 0 AND $value <= 100;
DEFINE FIELD status ON TABLE security_event TYPE string \
    ASSERT $value IN ['Open', 'Investigating', 'Resolved'];
DEFINE FIELD metadata ON TABLE security_event TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE security_event TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_security_org_ts ON TABLE security_event \
    COLUMNS organization_id, created_at;
DEFINE INDEX idx_security_status ON TABLE security_event COLUMNS status;

-- =======================================================================
-- Compliance reports
-- =======================================================================
DEFINE TABLE compliance_report SCHEMAFULL;
DEFINE FIELD report_type ON TABLE compliance_report TYPE string \
    ASSERT $value IN ['Soc2', 'Gdpr', 'Hipaa', 'Custom'];
DEFINE FIELD title ON TABLE compliance_report TYPE string;
DEFINE FIELD organization_id ON TABLE compliance_report \
    TYPE option<string>;
DEFINE FIELD period_start ON TABLE compliance_report TYPE datetime;
DEFINE FIELD period_end ON TABLE compliance_report TYPE datetime;
DEFINE FIELD data ON TABLE compliance_report TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD status ON TABLE compliance_report TYPE string \
    ASSERT $value IN ['Completed'];
DEFINE FIELD compliance_score ON TABLE compliance_report TYPE int \
    ASSERT $value >= 0 AND $value <= 100;
DEFINE FIELD findings ON TABLE compliance_report TYPE array<string> \
    DEFAULT [];
DEFINE FIELD recommendations ON TABLE compliance_report \
    TYPE array<string> DEFAULT [];
DEFINE FIELD generated_at ON TABLE compliance_report TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_report_org_ts ON TABLE compliance_report \
    COLUMNS organization_id, generated_at;
";

/// The v1 schema DDL, exposed for inspection in tests.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

/// Apply any pending migrations.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version, name FROM _migration ORDER BY version ASC")
        .await?;
    let applied: Vec<MigrationRecord> = result.take(0)?;
    let current = applied.iter().map(|m| m.version).max().unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        db.query(migration.sql)
            .await?
            .check()
            .map_err(|e| DbError::Migration(format!("{}: {e}", migration.name)))?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name.to_string()))
            .await?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;
    }

    Ok(())
}
