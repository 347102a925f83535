//! Audit event domain model.
//!
//! Audit events are append-only: once created they are never mutated,
//! and `retention_until` is derived from the action exactly once at
//! creation time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::Metadata;
use crate::retention::retention_for;

/// Namespaced audit action.
///
/// Known actions are modelled as variants so retention and risk lookup
/// tables match exhaustively; anything else is carried as
/// [`AuditAction::Other`] and deliberately falls into the permissive
/// default branches.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuditAction {
    Login,
    Logout,
    LoginFailed,
    MfaSetup,
    DataCreate,
    DataRead,
    DataUpdate,
    DataDelete,
    DataExport,
    SecurityEvent,
    VulnerabilityScan,
    RoleAssign,
    PermissionGrant,
    UserPromote,
    Other(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::MfaSetup => "MFA_SETUP",
            AuditAction::DataCreate => "DATA_CREATE",
            AuditAction::DataRead => "DATA_READ",
            AuditAction::DataUpdate => "DATA_UPDATE",
            AuditAction::DataDelete => "DATA_DELETE",
            AuditAction::DataExport => "DATA_EXPORT",
            AuditAction::SecurityEvent => "SECURITY_EVENT",
            AuditAction::VulnerabilityScan => "VULNERABILITY_SCAN",
            AuditAction::RoleAssign => "ROLE_ASSIGN",
            AuditAction::PermissionGrant => "PERMISSION_GRANT",
            AuditAction::UserPromote => "USER_PROMOTE",
            AuditAction::Other(s) => s,
        }
    }

    /// True for any `DATA_*` action.
    pub fn is_data_access(&self) -> bool {
        matches!(
            self,
            AuditAction::DataCreate
                | AuditAction::DataRead
                | AuditAction::DataUpdate
                | AuditAction::DataDelete
                | AuditAction::DataExport
        )
    }
}

impl FromStr for AuditAction {
    type Err = std::convert::Infallible;

    /// Total: unknown strings become [`AuditAction::Other`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "LOGIN" => AuditAction::Login,
            "LOGOUT" => AuditAction::Logout,
            "LOGIN_FAILED" => AuditAction::LoginFailed,
            "MFA_SETUP" => AuditAction::MfaSetup,
            "DATA_CREATE" => AuditAction::DataCreate,
            "DATA_READ" => AuditAction::DataRead,
            "DATA_UPDATE" => AuditAction::DataUpdate,
            "DATA_DELETE" => AuditAction::DataDelete,
            "DATA_EXPORT" => AuditAction::DataExport,
            "SECURITY_EVENT" => AuditAction::SecurityEvent,
            "VULNERABILITY_SCAN" => AuditAction::VulnerabilityScan,
            "ROLE_ASSIGN" => AuditAction::RoleAssign,
            "PERMISSION_GRANT" => AuditAction::PermissionGrant,
            "USER_PROMOTE" => AuditAction::UserPromote,
            other => AuditAction::Other(other.to_string()),
        })
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AuditAction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuditAction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().expect("AuditAction parse is infallible"))
    }
}

/// Compliance regimes an audit event is tagged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceFlag {
    Soc2,
    Gdpr,
    Hipaa,
}

impl ComplianceFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceFlag::Soc2 => "SOC2",
            ComplianceFlag::Gdpr => "GDPR",
            ComplianceFlag::Hipaa => "HIPAA",
        }
    }
}

/// Immutable record of one observed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub action: AuditAction,
    pub resource: String,
    pub resource_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub success: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub metadata: Metadata,
    /// 0-100 heuristic severity estimate.
    pub risk_score: u8,
    pub anomaly_flags: Vec<String>,
    pub compliance_flags: Vec<ComplianceFlag>,
    /// Eligible for deletion once `now > retention_until`. Derived from
    /// `action` at creation and never recomputed.
    pub retention_until: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

/// Input for appending a new audit event.
///
/// Construct via [`CreateAuditEvent::new`], which is the single place
/// the retention policy is applied, then override fields with struct
/// update syntax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditEvent {
    pub action: AuditAction,
    pub resource: String,
    pub resource_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub success: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub metadata: Metadata,
    pub risk_score: u8,
    pub anomaly_flags: Vec<String>,
    pub compliance_flags: Vec<ComplianceFlag>,
    pub retention_until: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

impl CreateAuditEvent {
    /// New event for `action` at the current instant, with the
    /// retention horizon computed from the policy table.
    pub fn new(action: AuditAction) -> Self {
        Self::at(action, Utc::now())
    }

    /// New event with an explicit timestamp. Retention is still derived
    /// from the action so the `retention_until - timestamp` invariant
    /// holds for backdated events as well.
    pub fn at(action: AuditAction, timestamp: DateTime<Utc>) -> Self {
        let retention_until = timestamp + retention_for(&action);
        Self {
            action,
            resource: String::new(),
            resource_id: None,
            user_id: None,
            organization_id: None,
            session_id: None,
            ip_address: None,
            user_agent: None,
            endpoint: None,
            method: None,
            success: true,
            error_code: None,
            error_message: None,
            metadata: Metadata::default(),
            risk_score: 0,
            anomaly_flags: Vec::new(),
            compliance_flags: Vec::new(),
            retention_until,
            timestamp,
        }
    }
}
