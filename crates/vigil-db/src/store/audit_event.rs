//! SurrealDB implementation of [`AuditEventStore`].
//!
//! The audit trail is append-only: this store exposes no update or
//! delete operations. Retention sweeps are handled by an external job
//! that respects `retention_until`.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use vigil_core::error::VigilResult;
use vigil_core::metadata::Metadata;
use vigil_core::models::audit::{AuditAction, AuditEvent, ComplianceFlag, CreateAuditEvent};
use vigil_core::store::{AuditEventFilter, AuditEventStore, Pagination};

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditEventRow {
    action: String,
    resource: String,
    resource_id: Option<String>,
    user_id: Option<String>,
    organization_id: Option<String>,
    session_id: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    endpoint: Option<String>,
    method: Option<String>,
    success: bool,
    error_code: Option<String>,
    error_message: Option<String>,
    metadata: serde_json::Value,
    risk_score: u32,
    anomaly_flags: Vec<String>,
    compliance_flags: Vec<String>,
    retention_until: DateTime<Utc>,
    timestamp: DateTime<Utc>,
}

/// Row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct AuditEventRowWithId {
    record_id: String,
    action: String,
    resource: String,
    resource_id: Option<String>,
    user_id: Option<String>,
    organization_id: Option<String>,
    session_id: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    endpoint: Option<String>,
    method: Option<String>,
    success: bool,
    error_code: Option<String>,
    error_message: Option<String>,
    metadata: serde_json::Value,
    risk_score: u32,
    anomaly_flags: Vec<String>,
    compliance_flags: Vec<String>,
    retention_until: DateTime<Utc>,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid_opt(value: Option<String>, field: &str) -> Result<Option<Uuid>, DbError> {
    value
        .map(|s| {
            Uuid::parse_str(&s).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
        })
        .transpose()
}

fn parse_flag(s: &str) -> Result<ComplianceFlag, DbError> {
    match s {
        "SOC2" => Ok(ComplianceFlag::Soc2),
        "GDPR" => Ok(ComplianceFlag::Gdpr),
        "HIPAA" => Ok(ComplianceFlag::Hipaa),
        other => Err(DbError::Decode(format!("unknown compliance flag: {other}"))),
    }
}

fn parse_risk(score: u32) -> Result<u8, DbError> {
    u8::try_from(score.min(100)).map_err(|e| DbError::Decode(format!("risk score: {e}")))
}

impl AuditEventRow {
    fn into_event(self, id: Uuid) -> Result<AuditEvent, DbError> {
        let action: AuditAction = self.action.parse().expect("action parse is infallible");
        Ok(AuditEvent {
            id,
            action,
            resource: self.resource,
            resource_id: self.resource_id,
            user_id: parse_uuid_opt(self.user_id, "user")?,
            organization_id: parse_uuid_opt(self.organization_id, "organization")?,
            session_id: parse_uuid_opt(self.session_id, "session")?,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            endpoint: self.endpoint,
            method: self.method,
            success: self.success,
            error_code: self.error_code,
            error_message: self.error_message,
            metadata: Metadata::try_from(self.metadata)
                .map_err(|e| DbError::Decode(e.to_string()))?,
            risk_score: parse_risk(self.risk_score)?,
            anomaly_flags: self.anomaly_flags,
            compliance_flags: self
                .compliance_flags
                .iter()
                .map(|s| parse_flag(s))
                .collect::<Result<Vec<_>, _>>()?,
            retention_until: self.retention_until,
            timestamp: self.timestamp,
        })
    }
}

impl AuditEventRowWithId {
    fn try_into_event(self) -> Result<AuditEvent, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        AuditEventRow {
            action: self.action,
            resource: self.resource,
            resource_id: self.resource_id,
            user_id: self.user_id,
            organization_id: self.organization_id,
            session_id: self.session_id,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            endpoint: self.endpoint,
            method: self.method,
            success: self.success,
            error_code: self.error_code,
            error_message: self.error_message,
            metadata: self.metadata,
            risk_score: self.risk_score,
            anomaly_flags: self.anomaly_flags,
            compliance_flags: self.compliance_flags,
            retention_until: self.retention_until,
            timestamp: self.timestamp,
        }
        .into_event(id)
    }
}

/// Condition snippets for the optional filter fields. Bind names match
/// [`bind_filter`] below.
fn filter_conditions(filter: &AuditEventFilter) -> Vec<&'static str> {
    let mut conds = Vec::new();
    if filter.user_id.is_some() {
        conds.push("user_id = $user_id");
    }
    if filter.organization_id.is_some() {
        conds.push("organization_id = $organization_id");
    }
    if filter.action_contains.is_some() {
        conds.push("string::contains(action, $action_contains)");
    }
    if filter.resource.is_some() {
        conds.push("resource = $resource");
    }
    if filter.success.is_some() {
        conds.push("success = $success");
    }
    if filter.from.is_some() {
        conds.push("timestamp >= $from");
    }
    if filter.to.is_some() {
        conds.push("timestamp <= $to");
    }
    if filter.min_risk_score.is_some() {
        conds.push("risk_score >= $min_risk_score");
    }
    if filter.max_risk_score.is_some() {
        conds.push("risk_score <= $max_risk_score");
    }
    conds
}

fn where_clause(conds: &[&str]) -> String {
    if conds.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conds.join(" AND "))
    }
}

fn bind_filter<C: Connection>(
    mut query: surrealdb::method::Query<C>,
    filter: AuditEventFilter,
) -> surrealdb::method::Query<C> {
    if let Some(user_id) = filter.user_id {
        query = query.bind(("user_id", user_id.to_string()));
    }
    if let Some(org_id) = filter.organization_id {
        query = query.bind(("organization_id", org_id.to_string()));
    }
    if let Some(sub) = filter.action_contains {
        query = query.bind(("action_contains", sub));
    }
    if let Some(resource) = filter.resource {
        query = query.bind(("resource", resource));
    }
    if let Some(success) = filter.success {
        query = query.bind(("success", success));
    }
    if let Some(from) = filter.from {
        query = query.bind(("from", from));
    }
    if let Some(to) = filter.to {
        query = query.bind(("to", to));
    }
    if let Some(min) = filter.min_risk_score {
        query = query.bind(("min_risk_score", min as u32));
    }
    if let Some(max) = filter.max_risk_score {
        query = query.bind(("max_risk_score", max as u32));
    }
    query
}

/// SurrealDB implementation of the audit event store.
#[derive(Clone)]
pub struct SurrealAuditEventStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditEventStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditEventStore for SurrealAuditEventStore<C> {
    async fn append(&self, input: CreateAuditEvent) -> VigilResult<AuditEvent> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let flags: Vec<String> = input
            .compliance_flags
            .iter()
            .map(|f| f.as_str().to_string())
            .collect();

        let result = self
            .db
            .query(
                "CREATE type::record('audit_event', $id) SET \
                 action = $action, \
                 resource = $resource, \
                 resource_id = $resource_id, \
                 user_id = $user_id, \
                 organization_id = $organization_id, \
                 session_id = $session_id, \
                 ip_address = $ip_address, \
                 user_agent = $user_agent, \
                 endpoint = $endpoint, \
                 method = $method, \
                 success = $success, \
                 error_code = $error_code, \
                 error_message = $error_message, \
                 metadata = $metadata, \
                 risk_score = $risk_score, \
                 anomaly_flags = $anomaly_flags, \
                 compliance_flags = $compliance_flags, \
                 retention_until = $retention_until, \
                 timestamp = $timestamp",
            )
            .bind(("id", id_str.clone()))
            .bind(("action", input.action.as_str().to_string()))
            .bind(("resource", input.resource))
            .bind(("resource_id", input.resource_id))
            .bind(("user_id", input.user_id.map(|u| u.to_string())))
            .bind(("organization_id", input.organization_id.map(|u| u.to_string())))
            .bind(("session_id", input.session_id.map(|u| u.to_string())))
            .bind(("ip_address", input.ip_address))
            .bind(("user_agent", input.user_agent))
            .bind(("endpoint", input.endpoint))
            .bind(("method", input.method))
            .bind(("success", input.success))
            .bind(("error_code", input.error_code))
            .bind(("error_message", input.error_message))
            .bind(("metadata", input.metadata.into_value()))
            .bind(("risk_score", input.risk_score as u32))
            .bind(("anomaly_flags", input.anomaly_flags))
            .bind(("compliance_flags", flags))
            .bind(("retention_until", input.retention_until))
            .bind(("timestamp", input.timestamp))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<AuditEventRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_event".into(),
            id: id_str,
        })?;

        Ok(row.into_event(id)?)
    }

    async fn find(
        &self,
        filter: AuditEventFilter,
        pagination: Pagination,
    ) -> VigilResult<Vec<AuditEvent>> {
        let conds = filter_conditions(&filter);
        let sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM audit_event{} \
             ORDER BY timestamp DESC LIMIT $limit START $offset",
            where_clause(&conds)
        );

        let query = bind_filter(self.db.query(sql), filter)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));

        let mut result = query.await.map_err(DbError::from)?;
        let rows: Vec<AuditEventRowWithId> = result.take(0).map_err(DbError::from)?;

        let events = rows
            .into_iter()
            .map(|row| row.try_into_event())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(events)
    }

    async fn count(&self, filter: AuditEventFilter) -> VigilResult<u64> {
        let conds = filter_conditions(&filter);
        let sql = format!(
            "SELECT count() AS total FROM audit_event{} GROUP ALL",
            where_clause(&conds)
        );

        let mut result = bind_filter(self.db.query(sql), filter)
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
