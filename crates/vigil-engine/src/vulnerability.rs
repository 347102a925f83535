//! Identity-posture vulnerability scanning.
//!
//! Each check reads one posture signal and turns it into at most one
//! finding. Checks are independent: a failing signal is logged and
//! skipped, the scan completes with the rest (best-effort partial).

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use vigil_core::{VigilError, VigilResult};
use vigil_core::metadata::Metadata;
use vigil_core::models::audit::{AuditAction, CreateAuditEvent};
use vigil_core::models::security::Severity;
use vigil_core::models::vulnerability::{VulnerabilityFinding, VulnerabilityType};
use vigil_core::store::{AuditEventStore, PostureSource};

use crate::cancel::CancelFlag;
use crate::config::EngineConfig;

/// Standing recommendations attached whenever a scan finds anything.
const STANDING_RECOMMENDATIONS: &[&str] = &[
    "Conduct regular security assessments",
    "Provide security training for all staff",
    "Keep dependencies up to date",
];

/// Result of one scan. Findings are transient; only the scan shell is
/// persisted to the audit trail.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub scan_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub findings: Vec<VulnerabilityFinding>,
    /// Sum of finding risk scores, capped at 100.
    pub total_risk: u8,
    pub recommendations: Vec<String>,
    pub scanned_at: DateTime<Utc>,
}

pub struct VulnerabilityScanner<P, A> {
    posture: P,
    audit: A,
    config: EngineConfig,
}

impl<P, A> VulnerabilityScanner<P, A>
where
    P: PostureSource,
    A: AuditEventStore,
{
    pub fn new(posture: P, audit: A, config: EngineConfig) -> Self {
        Self {
            posture,
            audit,
            config,
        }
    }

    /// Run all checks for the given scope. Cancellation is honored
    /// between checks; a cancelled scan performs no further reads and
    /// persists nothing.
    pub async fn scan(
        &self,
        organization_id: Option<Uuid>,
        cancel: &CancelFlag,
    ) -> VigilResult<ScanOutcome> {
        let scan_id = Uuid::new_v4();
        let mut findings = Vec::new();

        self.check_weak_passwords(organization_id, &mut findings)
            .await;
        cancel.check()?;
        self.check_mfa_coverage(organization_id, &mut findings).await;
        cancel.check()?;
        self.check_excessive_permissions(organization_id, &mut findings)
            .await;
        cancel.check()?;
        self.check_stale_sessions(organization_id, &mut findings)
            .await;
        cancel.check()?;
        self.check_missing_encryption(organization_id, &mut findings)
            .await;

        let total_risk = findings
            .iter()
            .map(|f| f.risk_score as u32)
            .sum::<u32>()
            .min(100) as u8;
        let recommendations = collect_recommendations(&findings);

        let outcome = ScanOutcome {
            scan_id,
            organization_id,
            findings,
            total_risk,
            recommendations,
            scanned_at: Utc::now(),
        };
        self.persist_scan_shell(&outcome).await;

        Ok(outcome)
    }

    async fn check_weak_passwords(
        &self,
        org: Option<Uuid>,
        findings: &mut Vec<VulnerabilityFinding>,
    ) {
        let weak = match self.posture.weak_password_count(org).await {
            Ok(n) => n,
            Err(err) => return skip_check("weak_passwords", err),
        };
        let users = match self.posture.user_count(org).await {
            Ok(n) => n,
            Err(err) => return skip_check("weak_passwords", err),
        };
        findings.extend(weak_password_finding(weak, users, &self.config));
    }

    async fn check_mfa_coverage(
        &self,
        org: Option<Uuid>,
        findings: &mut Vec<VulnerabilityFinding>,
    ) {
        let users = match self.posture.user_count(org).await {
            Ok(n) => n,
            Err(err) => return skip_check("insufficient_mfa", err),
        };
        let verified = match self.posture.verified_mfa_device_count(org).await {
            Ok(n) => n,
            Err(err) => return skip_check("insufficient_mfa", err),
        };
        findings.extend(mfa_finding(users, verified, &self.config));
    }

    async fn check_excessive_permissions(
        &self,
        org: Option<Uuid>,
        findings: &mut Vec<VulnerabilityFinding>,
    ) {
        let over = match self
            .posture
            .users_with_roles_over(org, self.config.max_roles_per_user)
            .await
        {
            Ok(n) => n,
            Err(err) => return skip_check("excessive_permissions", err),
        };
        findings.extend(excessive_permissions_finding(over, &self.config));
    }

    async fn check_stale_sessions(
        &self,
        org: Option<Uuid>,
        findings: &mut Vec<VulnerabilityFinding>,
    ) {
        let cutoff = Utc::now() - Duration::days(self.config.stale_session_days);
        let stale = match self.posture.stale_session_count(org, cutoff).await {
            Ok(n) => n,
            Err(err) => return skip_check("stale_sessions", err),
        };
        findings.extend(stale_sessions_finding(stale, &self.config));
    }

    async fn check_missing_encryption(
        &self,
        org: Option<Uuid>,
        findings: &mut Vec<VulnerabilityFinding>,
    ) {
        let encrypted = match self.posture.encrypted_field_count(org).await {
            Ok(n) => n,
            Err(err) => return skip_check("missing_encryption", err),
        };
        findings.extend(missing_encryption_finding(encrypted));
    }

    /// Record that the scan ran. Findings themselves are transient, so
    /// a failed shell write degrades the trail, not the scan result.
    async fn persist_scan_shell(&self, outcome: &ScanOutcome) {
        let input = CreateAuditEvent {
            resource: "VulnerabilityScan".into(),
            resource_id: Some(outcome.scan_id.to_string()),
            organization_id: outcome.organization_id,
            metadata: Metadata::new()
                .with("findingCount", outcome.findings.len() as u64)
                .with("totalRisk", outcome.total_risk),
            risk_score: outcome.total_risk,
            ..CreateAuditEvent::new(AuditAction::VulnerabilityScan)
        };
        if let Err(err) = self.audit.append(input).await {
            warn!(scan_id = %outcome.scan_id, error = %err, "Scan shell write failed");
        }
    }
}

fn skip_check(check: &str, err: VigilError) {
    warn!(check, error = %err, "Posture signal unavailable, skipping check");
}

/// Percentage with a zero-denominator guard.
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn weak_password_finding(
    weak: u64,
    users: u64,
    config: &EngineConfig,
) -> Option<VulnerabilityFinding> {
    if weak == 0 {
        return None;
    }
    let ratio = if users == 0 { 0.0 } else { weak as f64 / users as f64 };
    let high = ratio >= config.weak_password_high_ratio;
    Some(VulnerabilityFinding {
        finding_type: VulnerabilityType::WeakPasswords,
        severity: if high { Severity::High } else { Severity::Medium },
        title: "Weak credentials in use".into(),
        description: format!("{weak} of {users} users fail the credential strength policy"),
        risk_score: if high { 30 } else { 20 },
        recommendation: "Enforce the credential strength policy and require resets".into(),
        evidence: json!({ "weakCredentialUsers": weak, "totalUsers": users }),
    })
}

pub fn mfa_finding(users: u64, verified: u64, config: &EngineConfig) -> Option<VulnerabilityFinding> {
    if users == 0 {
        return None;
    }
    let coverage = percentage(verified, users);
    if coverage >= config.mfa_coverage_threshold {
        return None;
    }
    Some(VulnerabilityFinding {
        finding_type: VulnerabilityType::InsufficientMfa,
        severity: Severity::High,
        title: "Insufficient MFA coverage".into(),
        description: format!("{coverage:.1}% of users have a verified MFA device"),
        // Scales with the gap: 50% coverage scores 25, zero scores 50.
        risk_score: (50.0 - coverage / 2.0).round().clamp(0.0, 50.0) as u8,
        recommendation: "Require MFA enrollment for all user accounts".into(),
        evidence: json!({ "coveragePercent": coverage, "totalUsers": users, "verifiedUsers": verified }),
    })
}

pub fn excessive_permissions_finding(
    over_provisioned: u64,
    config: &EngineConfig,
) -> Option<VulnerabilityFinding> {
    if over_provisioned == 0 {
        return None;
    }
    Some(VulnerabilityFinding {
        finding_type: VulnerabilityType::ExcessivePermissions,
        severity: Severity::Medium,
        title: "Over-provisioned accounts".into(),
        description: format!(
            "{over_provisioned} users hold more than {} security roles",
            config.max_roles_per_user
        ),
        // Scales with headcount; five points per over-provisioned user.
        risk_score: (over_provisioned * 5).min(100) as u8,
        recommendation: "Apply least privilege and remove unneeded role grants".into(),
        evidence: json!({ "overProvisionedUsers": over_provisioned, "maxRoles": config.max_roles_per_user }),
    })
}

pub fn stale_sessions_finding(stale: u64, config: &EngineConfig) -> Option<VulnerabilityFinding> {
    if stale <= config.stale_session_threshold {
        return None;
    }
    Some(VulnerabilityFinding {
        finding_type: VulnerabilityType::StaleSessions,
        severity: Severity::Low,
        title: "Stale sessions present".into(),
        description: format!(
            "{stale} sessions unused for over {} days",
            config.stale_session_days
        ),
        risk_score: (stale * 2).min(100) as u8,
        recommendation: "Expire idle sessions automatically".into(),
        evidence: json!({ "staleSessions": stale, "staleDays": config.stale_session_days }),
    })
}

pub fn missing_encryption_finding(encrypted_fields: u64) -> Option<VulnerabilityFinding> {
    if encrypted_fields > 0 {
        return None;
    }
    Some(VulnerabilityFinding {
        finding_type: VulnerabilityType::MissingEncryption,
        severity: Severity::High,
        title: "No field-level encryption configured".into(),
        description: "No encrypted field configurations exist in scope".into(),
        risk_score: 40,
        recommendation: "Configure field-level encryption for sensitive data".into(),
        evidence: json!({ "encryptedFields": 0 }),
    })
}

/// Per-finding recommendations, deduplicated, plus the standing set
/// when anything was found.
pub fn collect_recommendations(findings: &[VulnerabilityFinding]) -> Vec<String> {
    let mut recommendations: Vec<String> = Vec::new();
    for finding in findings {
        if !recommendations.contains(&finding.recommendation) {
            recommendations.push(finding.recommendation.clone());
        }
    }
    if !findings.is_empty() {
        for standing in STANDING_RECOMMENDATIONS {
            if !recommendations.iter().any(|r| r == standing) {
                recommendations.push((*standing).to_string());
            }
        }
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mfa_coverage_below_threshold_is_flagged() {
        let config = EngineConfig::default();

        let finding = mfa_finding(100, 50, &config).unwrap();
        assert_eq!(finding.finding_type, VulnerabilityType::InsufficientMfa);
        assert_eq!(finding.risk_score, 25);
        assert_eq!(finding.severity, Severity::High);

        // Score scales with the coverage gap.
        let finding = mfa_finding(100, 30, &config).unwrap();
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.risk_score, 35);

        assert!(mfa_finding(100, 85, &config).is_none());
        // No users: nothing to measure, no division by zero.
        assert!(mfa_finding(0, 0, &config).is_none());
    }

    #[test]
    fn weak_password_severity_tracks_prevalence() {
        let config = EngineConfig::default();
        assert!(weak_password_finding(0, 100, &config).is_none());

        let few = weak_password_finding(5, 100, &config).unwrap();
        assert_eq!(few.severity, Severity::Medium);
        assert_eq!(few.risk_score, 20);

        let many = weak_password_finding(25, 100, &config).unwrap();
        assert_eq!(many.severity, Severity::High);
        assert_eq!(many.risk_score, 30);
    }

    #[test]
    fn excessive_permissions_score_scales_per_user() {
        let config = EngineConfig::default();
        assert!(excessive_permissions_finding(0, &config).is_none());

        let finding = excessive_permissions_finding(4, &config).unwrap();
        assert_eq!(finding.finding_type, VulnerabilityType::ExcessivePermissions);
        assert_eq!(finding.risk_score, 20);

        // Large populations still fit in the score range.
        let finding = excessive_permissions_finding(40, &config).unwrap();
        assert_eq!(finding.risk_score, 100);
    }

    #[test]
    fn stale_sessions_need_more_than_threshold() {
        let config = EngineConfig::default();
        assert!(stale_sessions_finding(5, &config).is_none());
        let finding = stale_sessions_finding(6, &config).unwrap();
        assert_eq!(finding.finding_type, VulnerabilityType::StaleSessions);
        assert_eq!(finding.severity, Severity::Low);
        // Two points per stale session.
        assert_eq!(finding.risk_score, 12);
        assert_eq!(stale_sessions_finding(30, &config).unwrap().risk_score, 60);
    }

    #[test]
    fn missing_encryption_only_when_none_configured() {
        assert!(missing_encryption_finding(1).is_none());
        let finding = missing_encryption_finding(0).unwrap();
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.risk_score, 40);
    }

    #[test]
    fn recommendations_deduplicate_and_add_standing_set() {
        let config = EngineConfig::default();
        let findings = vec![
            mfa_finding(100, 50, &config).unwrap(),
            mfa_finding(100, 40, &config).unwrap(),
        ];
        let recommendations = collect_recommendations(&findings);
        // One deduplicated per-finding entry plus the three standing.
        assert_eq!(recommendations.len(), 4);
        assert_eq!(recommendations[0], "Require MFA enrollment for all user accounts");
        assert_eq!(
            recommendations[1..],
            [
                "Conduct regular security assessments",
                "Provide security training for all staff",
                "Keep dependencies up to date",
            ]
        );

        assert!(collect_recommendations(&[]).is_empty());
    }
}
