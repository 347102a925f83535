//! SurrealDB implementation of [`SecurityEventStore`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use vigil_core::error::VigilResult;
use vigil_core::metadata::Metadata;
use vigil_core::models::security::{
    CreateSecurityEvent, SecurityCategory, SecurityEvent, SecurityEventStatus, SecurityEventType,
    Severity,
};
use vigil_core::store::{Pagination, SecurityEventFilter, SecurityEventStore};

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SecurityEventRow {
    event_type: String,
    severity: String,
    category: String,
    title: String,
    description: Option<String>,
    user_id: Option<String>,
    organization_id: Option<String>,
    detected_by: String,
    risk_score: u32,
    status: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SecurityEventRowWithId {
    record_id: String,
    event_type: String,
    severity: String,
    category: String,
    title: String,
    description: Option<String>,
    user_id: Option<String>,
    organization_id: Option<String>,
    detected_by: String,
    risk_score: u32,
    status: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_severity(s: &str) -> Result<Severity, DbError> {
    match s {
        "Low" => Ok(Severity::Low),
        "Medium" => Ok(Severity::Medium),
        "High" => Ok(Severity::High),
        "Critical" => Ok(Severity::Critical),
        other => Err(DbError::Decode(format!("unknown severity: {other}"))),
    }
}

fn parse_category(s: &str) -> Result<SecurityCategory, DbError> {
    match s {
        "Authentication" => Ok(SecurityCategory::Authentication),
        "Authorization" => Ok(SecurityCategory::Authorization),
        "DataAccess" => Ok(SecurityCategory::DataAccess),
        "System" => Ok(SecurityCategory::System),
        other => Err(DbError::Decode(format!("unknown category: {other}"))),
    }
}

fn parse_status(s: &str) -> Result<SecurityEventStatus, DbError> {
    match s {
        "Open" => Ok(SecurityEventStatus::Open),
        "Investigating" => Ok(SecurityEventStatus::Investigating),
        "Resolved" => Ok(SecurityEventStatus::Resolved),
        other => Err(DbError::Decode(format!("unknown status: {other}"))),
    }
}

fn parse_uuid_opt(value: Option<String>, field: &str) -> Result<Option<Uuid>, DbError> {
    value
        .map(|s| {
            Uuid::parse_str(&s).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
        })
        .transpose()
}

impl SecurityEventRow {
    fn into_event(self, id: Uuid) -> Result<SecurityEvent, DbError> {
        let event_type: SecurityEventType =
            self.event_type.parse().expect("type parse is infallible");
        Ok(SecurityEvent {
            id,
            event_type,
            severity: parse_severity(&self.severity)?,
            category: parse_category(&self.category)?,
            title: self.title,
            description: self.description,
            user_id: parse_uuid_opt(self.user_id, "user")?,
            organization_id: parse_uuid_opt(self.organization_id, "organization")?,
            detected_by: self.detected_by,
            risk_score: u8::try_from(self.risk_score.min(100))
                .map_err(|e| DbError::Decode(format!("risk score: {e}")))?,
            status: parse_status(&self.status)?,
            metadata: Metadata::try_from(self.metadata)
                .map_err(|e| DbError::Decode(e.to_string()))?,
            created_at: self.created_at,
        })
    }
}

impl SecurityEventRowWithId {
    fn try_into_event(self) -> Result<SecurityEvent, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        SecurityEventRow {
            event_type: self.event_type,
            severity: self.severity,
            category: self.category,
            title: self.title,
            description: self.description,
            user_id: self.user_id,
            organization_id: self.organization_id,
            detected_by: self.detected_by,
            risk_score: self.risk_score,
            status: self.status,
            metadata: self.metadata,
            created_at: self.created_at,
        }
        .into_event(id)
    }
}

/// Severity labels at or above the given floor, for `IN` filters.
fn severities_at_or_above(min: Severity) -> Vec<String> {
    [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ]
    .iter()
    .filter(|s| **s >= min)
    .map(|s| s.as_str().to_string())
    .collect()
}

fn filter_conditions(filter: &SecurityEventFilter) -> Vec<&'static str> {
    let mut conds = Vec::new();
    if filter.user_id.is_some() {
        conds.push("user_id = $user_id");
    }
    if filter.organization_id.is_some() {
        conds.push("organization_id = $organization_id");
    }
    if filter.status.is_some() {
        conds.push("status = $status");
    }
    if filter.min_severity.is_some() {
        conds.push("severity IN $severities");
    }
    if filter.from.is_some() {
        conds.push("created_at >= $from");
    }
    if filter.to.is_some() {
        conds.push("created_at <= $to");
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
    filter: SecurityEventFilter,
) -> surrealdb::method::Query<C> {
    if let Some(user_id) = filter.user_id {
        query = query.bind(("user_id", user_id.to_string()));
    }
    if let Some(org_id) = filter.organization_id {
        query = query.bind(("organization_id", org_id.to_string()));
    }
    if let Some(status) = filter.status {
        query = query.bind(("status", status.as_str().to_string()));
    }
    if let Some(min) = filter.min_severity {
        query = query.bind(("severities", severities_at_or_above(min)));
    }
    if let Some(from) = filter.from {
        query = query.bind(("from", from));
    }
    if let Some(to) = filter.to {
        query = query.bind(("to", to));
    }
    query
}

/// SurrealDB implementation of the security event store.
#[derive(Clone)]
pub struct SurrealSecurityEventStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSecurityEventStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SecurityEventStore for SurrealSecurityEventStore<C> {
    async fn append(&self, input: CreateSecurityEvent) -> VigilResult<SecurityEvent> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        // Category is derived from the type exactly once, here.
        let category = input.event_type.category();

        let result = self
            .db
            .query(
                "CREATE type::record('security_event', $id) SET \
                 event_type = $event_type, \
                 severity = $severity, \
                 category = $category, \
                 title = $title, \
                 description = $description, \
                 user_id = $user_id, \
                 organization_id = $organization_id, \
                 detected_by = $detected_by, \
                 risk_score = $risk_score, \
                 status = $status, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("event_type", input.event_type.as_str().to_string()))
            .bind(("severity", input.severity.as_str().to_string()))
            .bind(("category", category.as_str().to_string()))
            .bind(("title", input.title))
            .bind(("description", input.description))
            .bind(("user_id", input.user_id.map(|u| u.to_string())))
            .bind(("organization_id", input.organization_id.map(|u| u.to_string())))
            .bind(("detected_by", input.detected_by))
            .bind(("risk_score", input.risk_score as u32))
            .bind(("status", SecurityEventStatus::Open.as_str().to_string()))
            .bind(("metadata", input.metadata.into_value()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<SecurityEventRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "security_event".into(),
            id: id_str,
        })?;

        Ok(row.into_event(id)?)
    }

    async fn find(
        &self,
        filter: SecurityEventFilter,
        pagination: Pagination,
    ) -> VigilResult<Vec<SecurityEvent>> {
        let conds = filter_conditions(&filter);
        let sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM security_event{} \
             ORDER BY created_at DESC LIMIT $limit START $offset",
            where_clause(&conds)
        );

        let mut result = bind_filter(self.db.query(sql), filter)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SecurityEventRowWithId> = result.take(0).map_err(DbError::from)?;
        let events = rows
            .into_iter()
            .map(|row| row.try_into_event())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(events)
    }

    async fn count(&self, filter: SecurityEventFilter) -> VigilResult<u64> {
        let conds = filter_conditions(&filter);
        let sql = format!(
            "SELECT count() AS total FROM security_event{} GROUP ALL",
            where_clause(&conds)
        );

        let mut result = bind_filter(self.db.query(sql), filter)
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
