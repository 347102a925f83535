//! Vulnerability assessment types.
//!
//! Findings are transient: only the scan-result shell is persisted (as
//! an audit event carrying the scan id), so these types stay plain data.

use serde::{Deserialize, Serialize};

use crate::models::security::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VulnerabilityType {
    WeakPasswords,
    InsufficientMfa,
    ExcessivePermissions,
    StaleSessions,
    MissingEncryption,
}

impl VulnerabilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnerabilityType::WeakPasswords => "weak_passwords",
            VulnerabilityType::InsufficientMfa => "insufficient_mfa",
            VulnerabilityType::ExcessivePermissions => "excessive_permissions",
            VulnerabilityType::StaleSessions => "stale_sessions",
            VulnerabilityType::MissingEncryption => "missing_encryption",
        }
    }
}

/// One finding produced by a vulnerability check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityFinding {
    pub finding_type: VulnerabilityType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub risk_score: u8,
    pub recommendation: String,
    /// Check-specific evidence fields.
    pub evidence: serde_json::Value,
}
