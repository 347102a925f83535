//! Audit recorder — the single write path into the audit trail.

use tracing::warn;
use uuid::Uuid;

use vigil_core::VigilResult;
use vigil_core::metadata::Metadata;
use vigil_core::models::audit::{AuditAction, AuditEvent, ComplianceFlag, CreateAuditEvent};
use vigil_core::models::security::{CreateSecurityEvent, SecurityEvent};
use vigil_core::risk::{DataAccessKind, auth_risk, data_access_risk, security_event_risk};
use vigil_core::store::{
    AuditEventFilter, AuditEventStore, Pagination, SecurityEventStore, ThreatIntel,
};

use crate::config::EngineConfig;

/// Request-scoped context attached to recorded events.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub session_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
}

/// Records audit and security events with risk scores and compliance
/// tags attached.
///
/// `log` returns an explicit `Result` so callers that need durability
/// can observe failure; `log_swallowing` is the fire-and-forget variant
/// for call sites where audit logging must never break the operation
/// being observed.
pub struct AuditRecorder<A, S, I> {
    audit: A,
    security: S,
    intel: I,
    config: EngineConfig,
}

impl<A, S, I> AuditRecorder<A, S, I>
where
    A: AuditEventStore,
    S: SecurityEventStore,
    I: ThreatIntel,
{
    pub fn new(audit: A, security: S, intel: I, config: EngineConfig) -> Self {
        Self {
            audit,
            security,
            intel,
            config,
        }
    }

    pub fn audit_store(&self) -> &A {
        &self.audit
    }

    pub fn security_store(&self) -> &S {
        &self.security
    }

    pub fn intel(&self) -> &I {
        &self.intel
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Append one audit event. Durable on `Ok`.
    pub async fn log(&self, input: CreateAuditEvent) -> VigilResult<Uuid> {
        let event = self.audit.append(input).await?;
        Ok(event.id)
    }

    /// Append one audit event, swallowing store failure.
    ///
    /// The only place a store error is absorbed: the failure is logged
    /// and `None` returned so the observed operation proceeds.
    pub async fn log_swallowing(&self, input: CreateAuditEvent) -> Option<Uuid> {
        let action = input.action.clone();
        match self.audit.append(input).await {
            Ok(event) => Some(event.id),
            Err(err) => {
                warn!(action = %action, error = %err, "Audit write failed, continuing");
                None
            }
        }
    }

    /// Query the audit trail, newest first. The page size is capped so
    /// one query cannot drag an unbounded slice through memory.
    pub async fn query(
        &self,
        filter: AuditEventFilter,
        pagination: Pagination,
    ) -> VigilResult<Vec<AuditEvent>> {
        let capped = Pagination {
            offset: pagination.offset,
            limit: pagination.limit.min(self.config.query_row_cap),
        };
        self.audit.find(filter, capped).await
    }

    pub async fn count(&self, filter: AuditEventFilter) -> VigilResult<u64> {
        self.audit.count(filter).await
    }

    /// Record an authentication event with its risk score.
    ///
    /// The malicious-IP lookup fails open: an oracle error scores the
    /// event as if the IP were clean and the degradation is logged.
    pub async fn log_auth(
        &self,
        action: AuditAction,
        user_id: Option<Uuid>,
        metadata: Metadata,
        context: RequestContext,
    ) -> VigilResult<Uuid> {
        let malicious = match &context.ip_address {
            Some(ip) => match self.intel.is_known_malicious_ip(ip).await {
                Ok(hit) => hit,
                Err(err) => {
                    warn!(ip = %ip, error = %err, "Threat intel unavailable, failing open");
                    false
                }
            },
            None => false,
        };

        let risk_score = auth_risk(&action, &metadata, malicious);
        let success = action != AuditAction::LoginFailed;

        self.log(CreateAuditEvent {
            resource: "Authentication".into(),
            user_id,
            organization_id: context.organization_id,
            session_id: context.session_id,
            ip_address: context.ip_address,
            user_agent: context.user_agent,
            endpoint: context.endpoint,
            method: context.method,
            success,
            metadata,
            risk_score,
            compliance_flags: vec![ComplianceFlag::Soc2, ComplianceFlag::Gdpr],
            ..CreateAuditEvent::new(action)
        })
        .await
    }

    /// Record a data-access event with its risk score.
    pub async fn log_data_access(
        &self,
        kind: DataAccessKind,
        resource: &str,
        resource_id: Option<String>,
        user_id: Option<Uuid>,
        organization_id: Option<Uuid>,
        metadata: Metadata,
    ) -> VigilResult<Uuid> {
        let risk_score = data_access_risk(kind, resource, &metadata);

        self.log(CreateAuditEvent {
            resource: resource.to_string(),
            resource_id,
            user_id,
            organization_id,
            metadata,
            risk_score,
            compliance_flags: vec![
                ComplianceFlag::Gdpr,
                ComplianceFlag::Hipaa,
                ComplianceFlag::Soc2,
            ],
            ..CreateAuditEvent::new(kind.action())
        })
        .await
    }

    /// Record a detected incident plus its correlated audit event.
    ///
    /// The incident write is authoritative; the `SECURITY_EVENT` audit
    /// entry (resource id = incident id) is best-effort, so the two
    /// writes are eventually consistent rather than atomic.
    pub async fn log_security_event(
        &self,
        mut input: CreateSecurityEvent,
    ) -> VigilResult<SecurityEvent> {
        input.risk_score = security_event_risk(input.severity, &input.event_type);
        let event = self.security.append(input).await?;

        self.log_swallowing(CreateAuditEvent {
            resource: "SecurityEvent".into(),
            resource_id: Some(event.id.to_string()),
            user_id: event.user_id,
            organization_id: event.organization_id,
            metadata: Metadata::new()
                .with("eventType", event.event_type.as_str())
                .with("severity", event.severity.as_str()),
            risk_score: event.risk_score,
            compliance_flags: vec![ComplianceFlag::Soc2],
            ..CreateAuditEvent::new(AuditAction::SecurityEvent)
        })
        .await;

        Ok(event)
    }
}
