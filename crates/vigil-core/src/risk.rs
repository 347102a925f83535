//! Risk scoring — pure, deterministic 0-100 heuristics.
//!
//! Each scorer sums its contributing factors (no factor applied more
//! than once per event) and clamps to [0, 100]. Identical inputs always
//! yield identical scores: no randomness, no clock reads.

use crate::metadata::Metadata;
use crate::models::audit::AuditAction;
use crate::models::security::{SecurityEventType, Severity};

/// Resources whose access carries an extra risk weight.
const SENSITIVE_RESOURCES: &[&str] = &["User", "Organization", "SecurityRole", "EncryptedField"];

/// Verb classification for data-access scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataAccessKind {
    Create,
    Read,
    Update,
    Delete,
    Export,
}

impl DataAccessKind {
    /// The audit action this verb is recorded as.
    pub fn action(&self) -> AuditAction {
        match self {
            DataAccessKind::Create => AuditAction::DataCreate,
            DataAccessKind::Read => AuditAction::DataRead,
            DataAccessKind::Update => AuditAction::DataUpdate,
            DataAccessKind::Delete => AuditAction::DataDelete,
            DataAccessKind::Export => AuditAction::DataExport,
        }
    }
}

fn clamp(score: u32) -> u8 {
    score.min(100) as u8
}

/// Risk score for an authentication event.
pub fn auth_risk(action: &AuditAction, metadata: &Metadata, known_malicious_ip: bool) -> u8 {
    let mut score: u32 = match action {
        AuditAction::LoginFailed => 30,
        AuditAction::Login => 10,
        AuditAction::MfaSetup => 5,
        _ => 0,
    };

    if metadata.failed_attempts() > 3 {
        score += 20;
    }
    if metadata.new_device() {
        score += 15;
    }
    if metadata.new_location() {
        score += 10;
    }
    if known_malicious_ip {
        score += 50;
    }

    clamp(score)
}

/// Risk score for a data-access event.
pub fn data_access_risk(kind: DataAccessKind, resource: &str, metadata: &Metadata) -> u8 {
    let mut score: u32 = match kind {
        DataAccessKind::Delete => 40,
        DataAccessKind::Export => 30,
        DataAccessKind::Update => 20,
        DataAccessKind::Create => 10,
        DataAccessKind::Read => 5,
    };

    if SENSITIVE_RESOURCES.contains(&resource) {
        score += 20;
    }

    // Bulk bonus: the explicit flag wins; otherwise a large record
    // count earns the smaller bonus. Never both.
    if metadata.bulk_operation() {
        score += 15;
    } else if metadata.record_count().is_some_and(|n| n > 100) {
        score += 10;
    }

    clamp(score)
}

/// High-risk incident types that earn an extra weight.
fn is_high_risk_type(event_type: &SecurityEventType) -> bool {
    matches!(
        event_type,
        SecurityEventType::BruteForce
            | SecurityEventType::DataBreach
            | SecurityEventType::PrivilegeEscalation
    )
}

/// Risk score for a security event.
pub fn security_event_risk(severity: Severity, event_type: &SecurityEventType) -> u8 {
    let mut score: u32 = match severity {
        Severity::Critical => 90,
        Severity::High => 70,
        Severity::Medium => 40,
        Severity::Low => 20,
    };

    if is_high_risk_type(event_type) {
        score += 10;
    }

    clamp(score)
}
