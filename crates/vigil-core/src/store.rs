//! Store and oracle trait definitions.
//!
//! All durable state lives behind these traits; the engine components
//! take them as explicit constructor parameters (no ambient global
//! store), so concurrent tests stay isolated. All operations are async.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::VigilResult;
use crate::models::audit::{AuditEvent, CreateAuditEvent};
use crate::models::compliance::{ComplianceReport, CreateComplianceReport};
use crate::models::security::{
    CreateSecurityEvent, SecurityEvent, SecurityEventStatus, Severity,
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn first(limit: u64) -> Self {
        Self { offset: 0, limit }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// Query filter for audit events. All fields optional; absent fields
/// do not constrain the query.
#[derive(Debug, Clone, Default)]
pub struct AuditEventFilter {
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    /// Substring match on the action string.
    pub action_contains: Option<String>,
    /// Exact match on the resource.
    pub resource: Option<String>,
    pub success: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub min_risk_score: Option<u8>,
    pub max_risk_score: Option<u8>,
}

/// Query filter for security events.
#[derive(Debug, Clone, Default)]
pub struct SecurityEventFilter {
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub status: Option<SecurityEventStatus>,
    /// Events at or above this severity.
    pub min_severity: Option<Severity>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Durable stores (append-only ledgers)
// ---------------------------------------------------------------------------

/// Append/query store for the audit trail. `append` must be durable
/// before returning success; failure is distinguishable from success
/// via the `Result`.
pub trait AuditEventStore: Send + Sync {
    fn append(
        &self,
        input: CreateAuditEvent,
    ) -> impl Future<Output = VigilResult<AuditEvent>> + Send;

    /// Matching events, newest first.
    fn find(
        &self,
        filter: AuditEventFilter,
        pagination: Pagination,
    ) -> impl Future<Output = VigilResult<Vec<AuditEvent>>> + Send;

    fn count(&self, filter: AuditEventFilter) -> impl Future<Output = VigilResult<u64>> + Send;
}

/// Append/query store for detected incidents.
pub trait SecurityEventStore: Send + Sync {
    fn append(
        &self,
        input: CreateSecurityEvent,
    ) -> impl Future<Output = VigilResult<SecurityEvent>> + Send;

    /// Matching events, newest first.
    fn find(
        &self,
        filter: SecurityEventFilter,
        pagination: Pagination,
    ) -> impl Future<Output = VigilResult<Vec<SecurityEvent>>> + Send;

    fn count(&self, filter: SecurityEventFilter)
    -> impl Future<Output = VigilResult<u64>> + Send;
}

/// Store for generated compliance reports.
pub trait ComplianceReportStore: Send + Sync {
    fn append(
        &self,
        input: CreateComplianceReport,
    ) -> impl Future<Output = VigilResult<ComplianceReport>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = VigilResult<ComplianceReport>> + Send;

    /// Reports for an organization, newest first.
    fn list_by_organization(
        &self,
        organization_id: Option<Uuid>,
        pagination: Pagination,
    ) -> impl Future<Output = VigilResult<Vec<ComplianceReport>>> + Send;
}

// ---------------------------------------------------------------------------
// Oracles (swappable collaborators, no default trust assumed)
// ---------------------------------------------------------------------------

/// Threat-intelligence membership oracle.
///
/// The IP lookup may reach external infrastructure and so is async and
/// fallible; the caller fails open on error. User-agent inspection is a
/// local pattern match and stays synchronous.
pub trait ThreatIntel: Send + Sync {
    fn is_known_malicious_ip(&self, ip: &str) -> impl Future<Output = VigilResult<bool>> + Send;

    fn is_suspicious_user_agent(&self, user_agent: &str) -> bool;
}

/// Identity-store posture snapshot consumed by the vulnerability
/// scanner. Each method is one independent signal; a failing signal is
/// skipped, not fatal.
pub trait PostureSource: Send + Sync {
    /// Total users in scope.
    fn user_count(
        &self,
        organization_id: Option<Uuid>,
    ) -> impl Future<Output = VigilResult<u64>> + Send;

    /// Users with a verified MFA device.
    fn verified_mfa_device_count(
        &self,
        organization_id: Option<Uuid>,
    ) -> impl Future<Output = VigilResult<u64>> + Send;

    /// Users holding more than `max_roles` security roles.
    fn users_with_roles_over(
        &self,
        organization_id: Option<Uuid>,
        max_roles: u32,
    ) -> impl Future<Output = VigilResult<u64>> + Send;

    /// Sessions unused since `cutoff`.
    fn stale_session_count(
        &self,
        organization_id: Option<Uuid>,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = VigilResult<u64>> + Send;

    /// Field-level encryption configurations in scope.
    fn encrypted_field_count(
        &self,
        organization_id: Option<Uuid>,
    ) -> impl Future<Output = VigilResult<u64>> + Send;

    /// Users whose stored credential fails the strength policy. This is
    /// a real signal from the identity store, not a simulation.
    fn weak_password_count(
        &self,
        organization_id: Option<Uuid>,
    ) -> impl Future<Output = VigilResult<u64>> + Send;
}
