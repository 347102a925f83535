//! Compliance report domain model.
//!
//! A report is a point-in-time artifact: the score, findings, and
//! recommendations are pure functions of the analysis data, so
//! regenerating a report over an identical event set yields identical
//! output.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportType {
    Soc2,
    Gdpr,
    Hipaa,
    Custom,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Soc2 => "Soc2",
            ReportType::Gdpr => "Gdpr",
            ReportType::Hipaa => "Hipaa",
            ReportType::Custom => "Custom",
        }
    }

    /// Human-readable report title prefix.
    pub fn title(&self) -> &'static str {
        match self {
            ReportType::Soc2 => "SOC 2 Compliance Report",
            ReportType::Gdpr => "GDPR Compliance Report",
            ReportType::Hipaa => "HIPAA Compliance Report",
            ReportType::Custom => "Custom Compliance Report",
        }
    }
}

/// Generation is synchronous — there is no partial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Completed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Completed => "Completed",
        }
    }
}

/// SOC 2 access-control analysis over the report period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Soc2Analysis {
    pub total_events: u64,
    pub login_attempts: u64,
    pub failed_logins: u64,
    /// 0 when there were no login attempts (never NaN).
    pub login_failure_rate: f64,
    /// Events with risk score >= 70.
    pub high_risk_events: u64,
    pub security_events: u64,
}

/// GDPR data-processing analysis over the report period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GdprAnalysis {
    pub total_events: u64,
    /// `DATA_*` operations, treated as personal-data processing volume.
    pub personal_data_accesses: u64,
    pub data_exports: u64,
    pub data_deletions: u64,
    /// Security-event records at breach-level risk (>= 70).
    pub detected_breaches: u64,
}

/// HIPAA PHI-access analysis over the report period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HipaaAnalysis {
    pub total_events: u64,
    pub phi_accesses: u64,
    pub failed_accesses: u64,
    /// 0 when there were no accesses (never NaN).
    pub failed_access_rate: f64,
}

/// Free-form analysis for custom report types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomAnalysis {
    pub total_events: u64,
    pub failed_events: u64,
    pub high_risk_events: u64,
    /// Event count per action, ordered for deterministic output.
    pub actions: BTreeMap<String, u64>,
}

/// Type-specific analysis payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "analysis")]
pub enum ReportData {
    Soc2(Soc2Analysis),
    Gdpr(GdprAnalysis),
    Hipaa(HipaaAnalysis),
    Custom(CustomAnalysis),
}

impl ReportData {
    pub fn report_type(&self) -> ReportType {
        match self {
            ReportData::Soc2(_) => ReportType::Soc2,
            ReportData::Gdpr(_) => ReportType::Gdpr,
            ReportData::Hipaa(_) => ReportType::Hipaa,
            ReportData::Custom(_) => ReportType::Custom,
        }
    }
}

/// A generated compliance report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub id: Uuid,
    pub report_type: ReportType,
    pub title: String,
    pub organization_id: Option<Uuid>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub data: ReportData,
    pub status: ReportStatus,
    /// 0-100; deductions tied to specific findings.
    pub compliance_score: u8,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Input for persisting a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComplianceReport {
    pub report_type: ReportType,
    pub title: String,
    pub organization_id: Option<Uuid>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub data: ReportData,
    pub compliance_score: u8,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
}
