//! Compliance report generation.
//!
//! Analysis, scoring, findings, and recommendations are pure functions
//! of the event slice, so regenerating a report over identical events
//! yields an identical artifact (modulo id and generation time).

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use vigil_core::VigilResult;
use vigil_core::models::audit::{AuditAction, AuditEvent};
use vigil_core::models::compliance::{
    ComplianceReport, CreateComplianceReport, CustomAnalysis, GdprAnalysis, HipaaAnalysis,
    ReportData, ReportType, Soc2Analysis,
};
use vigil_core::models::security::Severity;
use vigil_core::store::{
    AuditEventFilter, AuditEventStore, ComplianceReportStore, Pagination, SecurityEventFilter,
    SecurityEventStore,
};

use crate::config::EngineConfig;

/// Events at or above this risk score count as high risk in reports.
const HIGH_RISK_SCORE: u8 = 70;

pub struct ComplianceReporter<A, S, R> {
    audit: A,
    security: S,
    reports: R,
    config: EngineConfig,
}

impl<A, S, R> ComplianceReporter<A, S, R>
where
    A: AuditEventStore,
    S: SecurityEventStore,
    R: ComplianceReportStore,
{
    pub fn new(audit: A, security: S, reports: R, config: EngineConfig) -> Self {
        Self {
            audit,
            security,
            reports,
            config,
        }
    }

    pub fn report_store(&self) -> &R {
        &self.reports
    }

    /// Generate and persist one report. When no period is given, the
    /// trailing default period ending now is used.
    pub async fn generate(
        &self,
        report_type: ReportType,
        organization_id: Option<Uuid>,
        period: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> VigilResult<ComplianceReport> {
        let (period_start, period_end) = period.unwrap_or_else(|| {
            let end = Utc::now();
            (end - Duration::days(self.config.report_period_days), end)
        });

        let events = self
            .audit
            .find(
                AuditEventFilter {
                    organization_id,
                    from: Some(period_start),
                    to: Some(period_end),
                    ..Default::default()
                },
                Pagination::first(self.config.max_report_events),
            )
            .await?;

        let data = match report_type {
            ReportType::Soc2 => {
                let incidents = self
                    .security
                    .count(SecurityEventFilter {
                        organization_id,
                        from: Some(period_start),
                        to: Some(period_end),
                        ..Default::default()
                    })
                    .await?;
                ReportData::Soc2(analyze_soc2(&events, incidents))
            }
            ReportType::Gdpr => {
                let breaches = self
                    .security
                    .count(SecurityEventFilter {
                        organization_id,
                        min_severity: Some(Severity::High),
                        from: Some(period_start),
                        to: Some(period_end),
                        ..Default::default()
                    })
                    .await?;
                ReportData::Gdpr(analyze_gdpr(&events, breaches))
            }
            ReportType::Hipaa => ReportData::Hipaa(analyze_hipaa(&events)),
            ReportType::Custom => ReportData::Custom(analyze_custom(&events)),
        };

        let assessment = assess(&data);

        self.reports
            .append(CreateComplianceReport {
                report_type,
                title: report_type.title().to_string(),
                organization_id,
                period_start,
                period_end,
                data,
                compliance_score: assessment.score,
                findings: assessment.findings,
                recommendations: assessment.recommendations,
            })
            .await
    }
}

fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

pub fn analyze_soc2(events: &[AuditEvent], security_events: u64) -> Soc2Analysis {
    let login_attempts = events
        .iter()
        .filter(|e| matches!(e.action, AuditAction::Login | AuditAction::LoginFailed))
        .count() as u64;
    let failed_logins = events
        .iter()
        .filter(|e| e.action == AuditAction::LoginFailed)
        .count() as u64;
    let high_risk_events = events
        .iter()
        .filter(|e| e.risk_score >= HIGH_RISK_SCORE)
        .count() as u64;

    Soc2Analysis {
        total_events: events.len() as u64,
        login_attempts,
        failed_logins,
        login_failure_rate: rate(failed_logins, login_attempts),
        high_risk_events,
        security_events,
    }
}

pub fn analyze_gdpr(events: &[AuditEvent], detected_breaches: u64) -> GdprAnalysis {
    GdprAnalysis {
        total_events: events.len() as u64,
        personal_data_accesses: events.iter().filter(|e| e.action.is_data_access()).count()
            as u64,
        data_exports: events
            .iter()
            .filter(|e| e.action == AuditAction::DataExport)
            .count() as u64,
        data_deletions: events
            .iter()
            .filter(|e| e.action == AuditAction::DataDelete)
            .count() as u64,
        detected_breaches,
    }
}

pub fn analyze_hipaa(events: &[AuditEvent]) -> HipaaAnalysis {
    let phi_accesses = events.iter().filter(|e| e.action.is_data_access()).count() as u64;
    let failed_accesses = events
        .iter()
        .filter(|e| e.action.is_data_access() && !e.success)
        .count() as u64;

    HipaaAnalysis {
        total_events: events.len() as u64,
        phi_accesses,
        failed_accesses,
        failed_access_rate: rate(failed_accesses, phi_accesses),
    }
}

pub fn analyze_custom(events: &[AuditEvent]) -> CustomAnalysis {
    let mut actions: BTreeMap<String, u64> = BTreeMap::new();
    for event in events {
        *actions.entry(event.action.as_str().to_string()).or_default() += 1;
    }

    CustomAnalysis {
        total_events: events.len() as u64,
        failed_events: events.iter().filter(|e| !e.success).count() as u64,
        high_risk_events: events
            .iter()
            .filter(|e| e.risk_score >= HIGH_RISK_SCORE)
            .count() as u64,
        actions,
    }
}

/// Score plus the findings that produced each deduction.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub score: u8,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Deterministic scoring: each threshold breach deducts a fixed amount
/// and emits one finding with its paired recommendation.
pub fn assess(data: &ReportData) -> Assessment {
    let mut deductions: u32 = 0;
    let mut findings = Vec::new();
    let mut recommendations: Vec<String> = Vec::new();

    let mut flag = |deduction: u32,
                    finding: String,
                    recommendation: &str,
                    findings: &mut Vec<String>,
                    recommendations: &mut Vec<String>| {
        deductions += deduction;
        findings.push(finding);
        let recommendation = recommendation.to_string();
        if !recommendations.contains(&recommendation) {
            recommendations.push(recommendation);
        }
    };

    match data {
        ReportData::Soc2(a) => {
            if a.login_failure_rate > 0.10 {
                flag(
                    20,
                    format!(
                        "Login failure rate of {:.1}% exceeds 10% threshold",
                        a.login_failure_rate * 100.0
                    ),
                    "Enforce account lockout after repeated failures",
                    &mut findings,
                    &mut recommendations,
                );
            }
            if a.high_risk_events > 10 {
                flag(
                    15,
                    format!("{} high-risk events in the period", a.high_risk_events),
                    "Investigate high-risk operations and tighten access controls",
                    &mut findings,
                    &mut recommendations,
                );
            }
        }
        ReportData::Gdpr(a) => {
            if a.detected_breaches > 0 {
                flag(
                    30,
                    format!("{} breach-level incidents detected", a.detected_breaches),
                    "Review breach response procedures and notification obligations",
                    &mut findings,
                    &mut recommendations,
                );
            }
            if a.personal_data_accesses > 1000 {
                flag(
                    10,
                    format!(
                        "{} personal-data accesses in the period",
                        a.personal_data_accesses
                    ),
                    "Review data minimization and access scoping",
                    &mut findings,
                    &mut recommendations,
                );
            }
        }
        ReportData::Hipaa(a) => {
            if a.failed_access_rate > 0.05 {
                flag(
                    20,
                    format!(
                        "Failed PHI access rate of {:.1}% exceeds 5% threshold",
                        a.failed_access_rate * 100.0
                    ),
                    "Audit PHI access controls and authorization paths",
                    &mut findings,
                    &mut recommendations,
                );
            }
        }
        // Custom reports are observational: histogram without a pass
        // bar, so nothing deducts.
        ReportData::Custom(_) => {}
    }

    Assessment {
        score: 100u32.saturating_sub(deductions).min(100) as u8,
        findings,
        recommendations,
    }
}
