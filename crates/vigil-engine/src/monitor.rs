//! Dashboard rollup over the last 24 hours.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use vigil_core::VigilResult;
use vigil_core::models::security::{SecurityEvent, SecurityEventStatus, SecurityEventType, Severity};
use vigil_core::store::{
    AuditEventFilter, AuditEventStore, Pagination, SecurityEventFilter, SecurityEventStore,
};

const MONITOR_WINDOW_HOURS: i64 = 24;
/// Incidents considered per rollup; the newest dominate the picture.
const MONITOR_EVENT_CAP: u64 = 500;

/// One alert surfaced on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAlert {
    pub id: Uuid,
    pub severity: Severity,
    pub event_type: SecurityEventType,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time posture summary.
#[derive(Debug, Clone, Serialize)]
pub struct SecuritySnapshot {
    pub organization_id: Option<Uuid>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Unresolved high or critical incidents in the window.
    pub active_threats: u64,
    /// 0-100 weighted posture score.
    pub risk_score: u8,
    pub alerts: Vec<SecurityAlert>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

pub struct SecurityMonitor<A, S> {
    audit: A,
    security: S,
}

impl<A, S> SecurityMonitor<A, S>
where
    A: AuditEventStore,
    S: SecurityEventStore,
{
    pub fn new(audit: A, security: S) -> Self {
        Self { audit, security }
    }

    /// Roll up the trailing 24 hours into one snapshot. Read-only.
    pub async fn monitor(&self, organization_id: Option<Uuid>) -> VigilResult<SecuritySnapshot> {
        let window_end = Utc::now();
        let window_start = window_end - Duration::hours(MONITOR_WINDOW_HOURS);

        let incidents = self
            .security
            .find(
                SecurityEventFilter {
                    organization_id,
                    from: Some(window_start),
                    to: Some(window_end),
                    ..Default::default()
                },
                Pagination::first(MONITOR_EVENT_CAP),
            )
            .await?;

        let failed_operations = self
            .audit
            .count(AuditEventFilter {
                organization_id,
                success: Some(false),
                from: Some(window_start),
                to: Some(window_end),
                ..Default::default()
            })
            .await?;

        let high_risk_operations = self
            .audit
            .count(AuditEventFilter {
                organization_id,
                min_risk_score: Some(70),
                from: Some(window_start),
                to: Some(window_end),
                ..Default::default()
            })
            .await?;

        let active: Vec<&SecurityEvent> = incidents
            .iter()
            .filter(|e| {
                e.status != SecurityEventStatus::Resolved && e.severity >= Severity::High
            })
            .collect();

        let risk_score = weighted_risk(&incidents, failed_operations, high_risk_operations);
        let alerts = active
            .iter()
            .map(|e| SecurityAlert {
                id: e.id,
                severity: e.severity,
                event_type: e.event_type.clone(),
                title: e.title.clone(),
                created_at: e.created_at,
            })
            .collect();
        let recommendations = recommend(&incidents, active.len() as u64, failed_operations);

        Ok(SecuritySnapshot {
            organization_id,
            window_start,
            window_end,
            active_threats: active.len() as u64,
            risk_score,
            alerts,
            recommendations,
            generated_at: Utc::now(),
        })
    }
}

/// Weighted posture score: incident severities plus operational
/// bonuses, capped at 100.
pub fn weighted_risk(
    incidents: &[SecurityEvent],
    failed_operations: u64,
    high_risk_operations: u64,
) -> u8 {
    let severity_weight: u64 = incidents
        .iter()
        .map(|e| match e.severity {
            Severity::Critical => 25u64,
            Severity::High => 15,
            Severity::Medium => 8,
            Severity::Low => 3,
        })
        .sum();

    let failed_bonus = (failed_operations * 2).min(20);
    let high_risk_bonus = (high_risk_operations * 5).min(25);

    (severity_weight + failed_bonus + high_risk_bonus).min(100) as u8
}

fn recommend(
    incidents: &[SecurityEvent],
    active_threats: u64,
    failed_operations: u64,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if incidents
        .iter()
        .any(|e| e.severity == Severity::Critical && e.status != SecurityEventStatus::Resolved)
    {
        recommendations.push("Immediate investigation required for critical incidents".to_string());
    }
    if active_threats > 0 {
        recommendations.push("Triage and resolve open security incidents".to_string());
    }
    if failed_operations > 10 {
        recommendations.push("Investigate the elevated operation failure rate".to_string());
    }
    if recommendations.is_empty() {
        recommendations.push("Security posture nominal; continue routine monitoring".to_string());
    }

    recommendations
}
