//! Security event domain model — detected incidents, distinct from the
//! raw audit trail.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::Metadata;

/// Incident taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecurityEventType {
    BruteForce,
    DataBreach,
    DataExfiltration,
    PrivilegeEscalation,
    MaliciousIp,
    SuspiciousClient,
    UnauthorizedAccess,
    AnomalousActivity,
    Other(String),
}

impl SecurityEventType {
    pub fn as_str(&self) -> &str {
        match self {
            SecurityEventType::BruteForce => "BRUTE_FORCE",
            SecurityEventType::DataBreach => "DATA_BREACH",
            SecurityEventType::DataExfiltration => "DATA_EXFILTRATION",
            SecurityEventType::PrivilegeEscalation => "PRIVILEGE_ESCALATION",
            SecurityEventType::MaliciousIp => "MALICIOUS_IP",
            SecurityEventType::SuspiciousClient => "SUSPICIOUS_CLIENT",
            SecurityEventType::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            SecurityEventType::AnomalousActivity => "ANOMALOUS_ACTIVITY",
            SecurityEventType::Other(s) => s,
        }
    }

    /// Fixed type → category lookup. Unknown types deliberately map to
    /// [`SecurityCategory::System`] rather than erroring.
    pub fn category(&self) -> SecurityCategory {
        match self {
            SecurityEventType::BruteForce | SecurityEventType::MaliciousIp => {
                SecurityCategory::Authentication
            }
            SecurityEventType::PrivilegeEscalation | SecurityEventType::UnauthorizedAccess => {
                SecurityCategory::Authorization
            }
            SecurityEventType::DataBreach | SecurityEventType::DataExfiltration => {
                SecurityCategory::DataAccess
            }
            SecurityEventType::SuspiciousClient
            | SecurityEventType::AnomalousActivity
            | SecurityEventType::Other(_) => SecurityCategory::System,
        }
    }
}

impl FromStr for SecurityEventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "BRUTE_FORCE" => SecurityEventType::BruteForce,
            "DATA_BREACH" => SecurityEventType::DataBreach,
            "DATA_EXFILTRATION" => SecurityEventType::DataExfiltration,
            "PRIVILEGE_ESCALATION" => SecurityEventType::PrivilegeEscalation,
            "MALICIOUS_IP" => SecurityEventType::MaliciousIp,
            "SUSPICIOUS_CLIENT" => SecurityEventType::SuspiciousClient,
            "UNAUTHORIZED_ACCESS" => SecurityEventType::UnauthorizedAccess,
            "ANOMALOUS_ACTIVITY" => SecurityEventType::AnomalousActivity,
            other => SecurityEventType::Other(other.to_string()),
        })
    }
}

impl fmt::Display for SecurityEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SecurityEventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SecurityEventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().expect("SecurityEventType parse is infallible"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityCategory {
    Authentication,
    Authorization,
    DataAccess,
    System,
}

impl SecurityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityCategory::Authentication => "Authentication",
            SecurityCategory::Authorization => "Authorization",
            SecurityCategory::DataAccess => "DataAccess",
            SecurityCategory::System => "System",
        }
    }
}

/// Case lifecycle. Transitions are owned by an external case-management
/// collaborator; the core only exposes the status for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityEventStatus {
    Open,
    Investigating,
    Resolved,
}

impl SecurityEventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventStatus::Open => "Open",
            SecurityEventStatus::Investigating => "Investigating",
            SecurityEventStatus::Resolved => "Resolved",
        }
    }
}

/// A detected incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub event_type: SecurityEventType,
    pub severity: Severity,
    /// Derived from `event_type` via the fixed lookup at creation.
    pub category: SecurityCategory,
    pub title: String,
    pub description: Option<String>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    /// `"system"` for automated detection.
    pub detected_by: String,
    pub risk_score: u8,
    pub status: SecurityEventStatus,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a new security event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecurityEvent {
    pub event_type: SecurityEventType,
    pub severity: Severity,
    pub title: String,
    pub description: Option<String>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub detected_by: String,
    pub risk_score: u8,
    pub metadata: Metadata,
}
