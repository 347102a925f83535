//! Integration tests for compliance report generation.

use chrono::{Duration, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

use vigil_core::metadata::Metadata;
use vigil_core::models::audit::{AuditAction, CreateAuditEvent};
use vigil_core::models::compliance::{ReportData, ReportStatus, ReportType};
use vigil_core::models::security::{CreateSecurityEvent, SecurityEventType, Severity};
use vigil_core::store::{AuditEventStore, ComplianceReportStore, SecurityEventStore};
use vigil_db::store::{
    SurrealAuditEventStore, SurrealComplianceReportStore, SurrealSecurityEventStore,
};
use vigil_engine::{ComplianceReporter, EngineConfig};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    vigil_db::run_migrations(&db).await.unwrap();
    db
}

fn reporter(
    db: &Surreal<Db>,
) -> ComplianceReporter<
    SurrealAuditEventStore<Db>,
    SurrealSecurityEventStore<Db>,
    SurrealComplianceReportStore<Db>,
> {
    ComplianceReporter::new(
        SurrealAuditEventStore::new(db.clone()),
        SurrealSecurityEventStore::new(db.clone()),
        SurrealComplianceReportStore::new(db.clone()),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn soc2_failure_rate_reduces_the_score() {
    let db = setup().await;
    let audit = SurrealAuditEventStore::new(db.clone());
    let reporter = reporter(&db);
    let org = Uuid::new_v4();

    for _ in 0..17 {
        audit
            .append(CreateAuditEvent {
                organization_id: Some(org),
                resource: "Authentication".into(),
                ..CreateAuditEvent::new(AuditAction::Login)
            })
            .await
            .unwrap();
    }
    for _ in 0..3 {
        audit
            .append(CreateAuditEvent {
                organization_id: Some(org),
                success: false,
                resource: "Authentication".into(),
                ..CreateAuditEvent::new(AuditAction::LoginFailed)
            })
            .await
            .unwrap();
    }

    let report = reporter
        .generate(ReportType::Soc2, Some(org), None)
        .await
        .unwrap();

    assert_eq!(report.report_type, ReportType::Soc2);
    assert_eq!(report.status, ReportStatus::Completed);
    // 15% failure rate breaches the 10% threshold: one -20 deduction.
    assert_eq!(report.compliance_score, 80);
    assert!(report.findings[0].contains("failure rate"));
    assert_eq!(report.recommendations.len(), 1);

    let ReportData::Soc2(analysis) = &report.data else {
        panic!("expected SOC 2 analysis");
    };
    assert_eq!(analysis.login_attempts, 20);
    assert_eq!(analysis.failed_logins, 3);

    // Persisted and fetchable.
    let fetched = reporter.report_store().get_by_id(report.id).await.unwrap();
    assert_eq!(fetched.compliance_score, 80);
}

#[tokio::test]
async fn gdpr_counts_breach_level_incidents() {
    let db = setup().await;
    let audit = SurrealAuditEventStore::new(db.clone());
    let security = SurrealSecurityEventStore::new(db.clone());
    let reporter = reporter(&db);
    let org = Uuid::new_v4();

    for action in [
        AuditAction::DataRead,
        AuditAction::DataExport,
        AuditAction::DataDelete,
    ] {
        audit
            .append(CreateAuditEvent {
                organization_id: Some(org),
                resource: "Record".into(),
                ..CreateAuditEvent::new(action)
            })
            .await
            .unwrap();
    }

    security
        .append(CreateSecurityEvent {
            event_type: SecurityEventType::DataBreach,
            severity: Severity::High,
            title: "Bulk export from unknown host".into(),
            description: None,
            user_id: None,
            organization_id: Some(org),
            detected_by: "system".into(),
            risk_score: 80,
            metadata: Metadata::default(),
        })
        .await
        .unwrap();

    let report = reporter
        .generate(ReportType::Gdpr, Some(org), None)
        .await
        .unwrap();

    let ReportData::Gdpr(analysis) = &report.data else {
        panic!("expected GDPR analysis");
    };
    assert_eq!(analysis.personal_data_accesses, 3);
    assert_eq!(analysis.data_exports, 1);
    assert_eq!(analysis.data_deletions, 1);
    assert_eq!(analysis.detected_breaches, 1);
    assert_eq!(report.compliance_score, 70);
}

#[tokio::test]
async fn explicit_period_scopes_the_report() {
    let db = setup().await;
    let audit = SurrealAuditEventStore::new(db.clone());
    let reporter = reporter(&db);
    let org = Uuid::new_v4();
    let now = Utc::now();

    // One event inside the period, one well before it.
    audit
        .append(CreateAuditEvent {
            organization_id: Some(org),
            resource: "Record".into(),
            ..CreateAuditEvent::at(AuditAction::DataRead, now - Duration::days(5))
        })
        .await
        .unwrap();
    audit
        .append(CreateAuditEvent {
            organization_id: Some(org),
            resource: "Record".into(),
            ..CreateAuditEvent::at(AuditAction::DataRead, now - Duration::days(90))
        })
        .await
        .unwrap();

    let report = reporter
        .generate(
            ReportType::Hipaa,
            Some(org),
            Some((now - Duration::days(30), now)),
        )
        .await
        .unwrap();

    let ReportData::Hipaa(analysis) = &report.data else {
        panic!("expected HIPAA analysis");
    };
    assert_eq!(analysis.total_events, 1);
    assert_eq!(analysis.phi_accesses, 1);
    assert_eq!(analysis.failed_access_rate, 0.0);
    assert_eq!(report.compliance_score, 100);
}

#[tokio::test]
async fn custom_report_over_empty_period_is_clean() {
    let db = setup().await;
    let reporter = reporter(&db);

    let report = reporter
        .generate(ReportType::Custom, None, None)
        .await
        .unwrap();

    let ReportData::Custom(analysis) = &report.data else {
        panic!("expected custom analysis");
    };
    assert_eq!(analysis.total_events, 0);
    assert!(analysis.actions.is_empty());
    assert_eq!(report.compliance_score, 100);
    assert!(report.findings.is_empty());
}
