//! Real-time threat evaluation on the request path.
//!
//! Signals are additive and each contributes at most once per
//! evaluation. The store lookups are time-windowed and row-capped so an
//! evaluation stays cheap even over a large audit trail.

use chrono::{Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use vigil_core::VigilResult;
use vigil_core::metadata::Metadata;
use vigil_core::models::audit::AuditAction;
use vigil_core::models::security::{CreateSecurityEvent, SecurityEventType, Severity};
use vigil_core::store::{
    AuditEventFilter, AuditEventStore, Pagination, SecurityEventStore, ThreatIntel,
};

use crate::recorder::AuditRecorder;

/// Resources whose modification suggests privilege escalation.
const ESCALATION_RESOURCES: &[&str] = &["SecurityRole", "SecurityPermission", "Organization"];

/// One request under evaluation. All fields optional: an empty request
/// scores zero.
#[derive(Debug, Clone, Default)]
pub struct ThreatRequest {
    pub user_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub resource: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Metadata,
}

/// Evaluation verdict.
#[derive(Debug, Clone)]
pub struct ThreatAssessment {
    /// Sum of the fired signals, uncapped.
    pub risk: u32,
    pub detected: bool,
    pub should_block: bool,
    /// Classification of the first signal that fired.
    pub threat_type: Option<SecurityEventType>,
    /// Human-readable trace of the fired signals.
    pub signals: Vec<String>,
    /// Incident recorded for this evaluation, when one was.
    pub security_event_id: Option<Uuid>,
}

/// Evaluates requests against threat signals and records incidents for
/// detections through the recorder path.
pub struct ThreatDetector<A, S, I> {
    recorder: AuditRecorder<A, S, I>,
}

impl<A, S, I> ThreatDetector<A, S, I>
where
    A: AuditEventStore,
    S: SecurityEventStore,
    I: ThreatIntel,
{
    pub fn new(recorder: AuditRecorder<A, S, I>) -> Self {
        Self { recorder }
    }

    pub fn recorder(&self) -> &AuditRecorder<A, S, I> {
        &self.recorder
    }

    /// Score one request. Oracle failure degrades to a clean-IP verdict
    /// rather than failing the request; store failure on the incident
    /// write does surface, since a detection must not be lost silently.
    pub async fn evaluate(&self, request: ThreatRequest) -> VigilResult<ThreatAssessment> {
        let config = self.recorder.config().clone();
        let mut risk: u32 = 0;
        let mut threat_type: Option<SecurityEventType> = None;
        let mut signals: Vec<String> = Vec::new();

        // Known-malicious source address.
        if let Some(ip) = &request.ip_address {
            let malicious = match self.recorder.intel().is_known_malicious_ip(ip).await {
                Ok(hit) => hit,
                Err(err) => {
                    warn!(ip = %ip, error = %err, "Threat intel unavailable, failing open");
                    false
                }
            };
            if malicious {
                risk += 80;
                threat_type.get_or_insert(SecurityEventType::MaliciousIp);
                signals.push(format!("Known malicious IP: {ip}"));
            }
        }

        // Automated-client fingerprint. Adds risk but never reclassifies
        // an evaluation already typed by a stronger signal.
        if let Some(ua) = &request.user_agent {
            if self.recorder.intel().is_suspicious_user_agent(ua) {
                risk += 30;
                threat_type.get_or_insert(SecurityEventType::SuspiciousClient);
                signals.push("Suspicious user agent".into());
            }
        }

        // Brute force: recent failed logins for this user, counting the
        // attempt under evaluation.
        if matches!(
            &request.action,
            Some(AuditAction::Login) | Some(AuditAction::LoginFailed)
        ) {
            if let Some(user) = request.user_id {
                let since = Utc::now() - Duration::seconds(config.brute_force_window_secs as i64);
                let failures = self
                    .recorder
                    .audit_store()
                    .find(
                        AuditEventFilter {
                            user_id: Some(user),
                            action_contains: Some("LOGIN_FAILED".into()),
                            from: Some(since),
                            ..Default::default()
                        },
                        Pagination::first(config.query_row_cap),
                    )
                    .await?;

                let attempts = failures.len() as u32 + 1;
                if attempts >= config.brute_force_attempt_threshold {
                    risk += (attempts * 10).min(80);
                    threat_type.get_or_insert(SecurityEventType::BruteForce);
                    signals.push(format!("{attempts} login attempts in window"));
                }

                if let Some(ip) = &request.ip_address {
                    let ip_attempts = failures
                        .iter()
                        .filter(|e| e.ip_address.as_deref() == Some(ip.as_str()))
                        .count() as u32
                        + 1;
                    if ip_attempts > config.brute_force_ip_threshold {
                        risk += (ip_attempts * 15).min(80);
                        threat_type.get_or_insert(SecurityEventType::BruteForce);
                        signals.push(format!("{ip_attempts} attempts from {ip}"));
                    }
                }
            }
        }

        // Privilege escalation by action or by target resource.
        if escalation_signal(request.action.as_ref(), request.resource.as_deref()) {
            risk += 60;
            threat_type.get_or_insert(SecurityEventType::PrivilegeEscalation);
            signals.push("Privilege escalation pattern".into());
        }

        // Data exfiltration: export/read volume plus payload size, with
        // the combined contribution capped.
        if matches!(
            &request.action,
            Some(AuditAction::DataExport) | Some(AuditAction::DataRead)
        ) {
            if let Some(user) = request.user_id {
                let since = Utc::now() - Duration::seconds(config.exfiltration_window_secs as i64);
                let mut exfil: u32 = 0;

                let exports = self
                    .recorder
                    .count(AuditEventFilter {
                        user_id: Some(user),
                        action_contains: Some("DATA_EXPORT".into()),
                        from: Some(since),
                        ..Default::default()
                    })
                    .await?;
                if exports > config.export_count_threshold {
                    exfil += exports as u32 * 15;
                    signals.push(format!("{exports} exports in window"));
                }

                let reads = self
                    .recorder
                    .count(AuditEventFilter {
                        user_id: Some(user),
                        action_contains: Some("DATA_READ".into()),
                        from: Some(since),
                        ..Default::default()
                    })
                    .await?;
                if reads > config.read_count_threshold {
                    exfil += (reads as u32 / 10).min(40);
                    signals.push(format!("{reads} reads in window"));
                }

                if request
                    .metadata
                    .export_size()
                    .is_some_and(|size| size > config.export_size_threshold_bytes)
                {
                    exfil += 30;
                    signals.push("Oversized export payload".into());
                }

                if exfil > 0 {
                    risk += exfil.min(80);
                    threat_type.get_or_insert(SecurityEventType::DataExfiltration);
                }
            }
        }

        let detected = risk > config.detection_threshold;
        let should_block = risk > config.block_threshold;

        let security_event_id = if detected {
            let event_type = threat_type
                .clone()
                .unwrap_or(SecurityEventType::AnomalousActivity);
            let event = self
                .recorder
                .log_security_event(CreateSecurityEvent {
                    severity: severity_for(risk),
                    title: format!("Threat detected: {event_type}"),
                    description: Some(signals.join("; ")),
                    user_id: request.user_id,
                    organization_id: request.organization_id,
                    detected_by: "system".into(),
                    risk_score: 0,
                    metadata: Metadata::new()
                        .with("totalRisk", risk)
                        .with(
                            "requestIp",
                            request.ip_address.clone().unwrap_or_default(),
                        )
                        .with(
                            "requestAction",
                            request
                                .action
                                .as_ref()
                                .map(|a| a.as_str().to_string())
                                .unwrap_or_default(),
                        ),
                    event_type,
                })
                .await?;
            Some(event.id)
        } else {
            None
        };

        Ok(ThreatAssessment {
            risk,
            detected,
            should_block,
            threat_type,
            signals,
            security_event_id,
        })
    }
}

/// Severity classification for a detection.
pub fn severity_for(risk: u32) -> Severity {
    if risk > 80 {
        Severity::Critical
    } else if risk > 60 {
        Severity::High
    } else {
        Severity::Medium
    }
}

/// Escalation fires on role/permission actions or writes against
/// authorization-bearing resources.
pub fn escalation_signal(action: Option<&AuditAction>, resource: Option<&str>) -> bool {
    let action_hit = matches!(
        action,
        Some(AuditAction::RoleAssign)
            | Some(AuditAction::PermissionGrant)
            | Some(AuditAction::UserPromote)
    );
    let resource_hit = resource.is_some_and(|r| ESCALATION_RESOURCES.contains(&r));
    action_hit || resource_hit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_bands() {
        assert_eq!(severity_for(55), Severity::Medium);
        assert_eq!(severity_for(61), Severity::High);
        assert_eq!(severity_for(80), Severity::High);
        assert_eq!(severity_for(81), Severity::Critical);
    }

    #[test]
    fn escalation_matches_actions_and_resources() {
        assert!(escalation_signal(Some(&AuditAction::RoleAssign), None));
        assert!(escalation_signal(Some(&AuditAction::UserPromote), None));
        assert!(escalation_signal(None, Some("SecurityRole")));
        assert!(escalation_signal(None, Some("SecurityPermission")));
        assert!(escalation_signal(None, Some("Organization")));
        // Ordinary resources never trip the resource clause.
        assert!(!escalation_signal(None, Some("Role")));
        assert!(!escalation_signal(None, Some("Permission")));
        assert!(!escalation_signal(Some(&AuditAction::DataRead), Some("Invoice")));
        assert!(!escalation_signal(None, None));
    }
}
