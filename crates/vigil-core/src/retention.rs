//! Retention policy — maps an action to its retention horizon.
//!
//! This table is the single source of truth for retention. Every code
//! path that creates an audit event goes through
//! [`CreateAuditEvent::new`](crate::models::audit::CreateAuditEvent::new),
//! which applies it exactly once.

use chrono::Duration;

use crate::models::audit::AuditAction;

/// Retention horizon for an action. Total: unknown actions fall into
/// the two-year default branch.
pub fn retention_for(action: &AuditAction) -> Duration {
    match action {
        // Authentication trail: 1 year.
        AuditAction::Login | AuditAction::Logout => Duration::days(365),
        // Destructive/exporting data operations: 7 years.
        AuditAction::DataDelete | AuditAction::DataExport => Duration::days(7 * 365),
        // Incident trail: 3 years.
        AuditAction::SecurityEvent => Duration::days(3 * 365),
        // Everything else: 2 years.
        AuditAction::LoginFailed
        | AuditAction::MfaSetup
        | AuditAction::DataCreate
        | AuditAction::DataRead
        | AuditAction::DataUpdate
        | AuditAction::VulnerabilityScan
        | AuditAction::RoleAssign
        | AuditAction::PermissionGrant
        | AuditAction::UserPromote
        | AuditAction::Other(_) => Duration::days(2 * 365),
    }
}
