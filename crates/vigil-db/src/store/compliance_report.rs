//! SurrealDB implementation of [`ComplianceReportStore`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use vigil_core::error::VigilResult;
use vigil_core::models::compliance::{
    ComplianceReport, CreateComplianceReport, ReportData, ReportStatus, ReportType,
};
use vigil_core::store::{ComplianceReportStore, Pagination};

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ReportRow {
    report_type: String,
    title: String,
    organization_id: Option<String>,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    data: serde_json::Value,
    status: String,
    compliance_score: u32,
    findings: Vec<String>,
    recommendations: Vec<String>,
    generated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ReportRowWithId {
    record_id: String,
    report_type: String,
    title: String,
    organization_id: Option<String>,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    data: serde_json::Value,
    status: String,
    compliance_score: u32,
    findings: Vec<String>,
    recommendations: Vec<String>,
    generated_at: DateTime<Utc>,
}

fn parse_report_type(s: &str) -> Result<ReportType, DbError> {
    match s {
        "Soc2" => Ok(ReportType::Soc2),
        "Gdpr" => Ok(ReportType::Gdpr),
        "Hipaa" => Ok(ReportType::Hipaa),
        "Custom" => Ok(ReportType::Custom),
        other => Err(DbError::Decode(format!("unknown report type: {other}"))),
    }
}

fn parse_report_status(s: &str) -> Result<ReportStatus, DbError> {
    match s {
        "Completed" => Ok(ReportStatus::Completed),
        other => Err(DbError::Decode(format!("unknown report status: {other}"))),
    }
}

impl ReportRow {
    fn into_report(self, id: Uuid) -> Result<ComplianceReport, DbError> {
        let organization_id = self
            .organization_id
            .map(|s| {
                Uuid::parse_str(&s)
                    .map_err(|e| DbError::Decode(format!("invalid organization UUID: {e}")))
            })
            .transpose()?;
        let data: ReportData = serde_json::from_value(self.data)
            .map_err(|e| DbError::Decode(format!("report data: {e}")))?;

        Ok(ComplianceReport {
            id,
            report_type: parse_report_type(&self.report_type)?,
            title: self.title,
            organization_id,
            period_start: self.period_start,
            period_end: self.period_end,
            data,
            status: parse_report_status(&self.status)?,
            compliance_score: u8::try_from(self.compliance_score.min(100))
                .map_err(|e| DbError::Decode(format!("compliance score: {e}")))?,
            findings: self.findings,
            recommendations: self.recommendations,
            generated_at: self.generated_at,
        })
    }
}

impl ReportRowWithId {
    fn try_into_report(self) -> Result<ComplianceReport, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        ReportRow {
            report_type: self.report_type,
            title: self.title,
            organization_id: self.organization_id,
            period_start: self.period_start,
            period_end: self.period_end,
            data: self.data,
            status: self.status,
            compliance_score: self.compliance_score,
            findings: self.findings,
            recommendations: self.recommendations,
            generated_at: self.generated_at,
        }
        .into_report(id)
    }
}

/// SurrealDB implementation of the compliance report store.
#[derive(Clone)]
pub struct SurrealComplianceReportStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealComplianceReportStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ComplianceReportStore for SurrealComplianceReportStore<C> {
    async fn append(&self, input: CreateComplianceReport) -> VigilResult<ComplianceReport> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let data = serde_json::to_value(&input.data)
            .map_err(|e| DbError::Decode(format!("report data: {e}")))?;

        let result = self
            .db
            .query(
                "CREATE type::record('compliance_report', $id) SET \
                 report_type = $report_type, \
                 title = $title, \
                 organization_id = $organization_id, \
                 period_start = $period_start, \
                 period_end = $period_end, \
                 data = $data, \
                 status = $status, \
                 compliance_score = $compliance_score, \
                 findings = $findings, \
                 recommendations = $recommendations",
            )
            .bind(("id", id_str.clone()))
            .bind(("report_type", input.report_type.as_str().to_string()))
            .bind(("title", input.title))
            .bind(("organization_id", input.organization_id.map(|u| u.to_string())))
            .bind(("period_start", input.period_start))
            .bind(("period_end", input.period_end))
            .bind(("data", data))
            .bind(("status", ReportStatus::Completed.as_str().to_string()))
            .bind(("compliance_score", input.compliance_score as u32))
            .bind(("findings", input.findings))
            .bind(("recommendations", input.recommendations))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<ReportRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "compliance_report".into(),
            id: id_str,
        })?;

        Ok(row.into_report(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> VigilResult<ComplianceReport> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('compliance_report', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReportRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "compliance_report".into(),
            id: id_str,
        })?;

        Ok(row.into_report(id)?)
    }

    async fn list_by_organization(
        &self,
        organization_id: Option<Uuid>,
        pagination: Pagination,
    ) -> VigilResult<Vec<ComplianceReport>> {
        let sql = if organization_id.is_some() {
            "SELECT meta::id(id) AS record_id, * FROM compliance_report \
             WHERE organization_id = $organization_id \
             ORDER BY generated_at DESC LIMIT $limit START $offset"
        } else {
            "SELECT meta::id(id) AS record_id, * FROM compliance_report \
             ORDER BY generated_at DESC LIMIT $limit START $offset"
        };

        let mut query = self.db.query(sql);
        if let Some(org_id) = organization_id {
            query = query.bind(("organization_id", org_id.to_string()));
        }

        let mut result = query
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReportRowWithId> = result.take(0).map_err(DbError::from)?;
        let reports = rows
            .into_iter()
            .map(|row| row.try_into_report())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(reports)
    }
}
