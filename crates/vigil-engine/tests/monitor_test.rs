//! Integration tests for the dashboard rollup.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

use vigil_core::metadata::Metadata;
use vigil_core::models::audit::{AuditAction, CreateAuditEvent};
use vigil_core::models::security::{CreateSecurityEvent, SecurityEventType, Severity};
use vigil_core::store::{AuditEventStore, SecurityEventStore};
use vigil_db::store::{SurrealAuditEventStore, SurrealSecurityEventStore};
use vigil_engine::SecurityMonitor;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    vigil_db::run_migrations(&db).await.unwrap();
    db
}

fn incident(org: Uuid, severity: Severity, title: &str) -> CreateSecurityEvent {
    CreateSecurityEvent {
        event_type: SecurityEventType::AnomalousActivity,
        severity,
        title: title.into(),
        description: None,
        user_id: None,
        organization_id: Some(org),
        detected_by: "system".into(),
        risk_score: 50,
        metadata: Metadata::default(),
    }
}

#[tokio::test]
async fn quiet_day_rolls_up_to_zero() {
    let db = setup().await;
    let monitor = SecurityMonitor::new(
        SurrealAuditEventStore::new(db.clone()),
        SurrealSecurityEventStore::new(db),
    );

    let snapshot = monitor.monitor(None).await.unwrap();

    assert_eq!(snapshot.active_threats, 0);
    assert_eq!(snapshot.risk_score, 0);
    assert!(snapshot.alerts.is_empty());
    assert_eq!(snapshot.recommendations.len(), 1);
    assert!(snapshot.recommendations[0].contains("nominal"));
}

#[tokio::test]
async fn open_incidents_drive_threats_alerts_and_score() {
    let db = setup().await;
    let audit = SurrealAuditEventStore::new(db.clone());
    let security = SurrealSecurityEventStore::new(db.clone());
    let monitor = SecurityMonitor::new(
        SurrealAuditEventStore::new(db.clone()),
        SurrealSecurityEventStore::new(db),
    );
    let org = Uuid::new_v4();

    security
        .append(incident(org, Severity::Critical, "credential stuffing"))
        .await
        .unwrap();
    security
        .append(incident(org, Severity::High, "export spike"))
        .await
        .unwrap();
    security
        .append(incident(org, Severity::Low, "odd user agent"))
        .await
        .unwrap();

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
    audit
        .append(CreateAuditEvent {
            organization_id: Some(org),
            risk_score: 85,
            resource: "User".into(),
            ..CreateAuditEvent::new(AuditAction::DataExport)
        })
        .await
        .unwrap();

    let snapshot = monitor.monitor(Some(org)).await.unwrap();

    // High and critical incidents are active threats; the low one only
    // contributes weight.
    assert_eq!(snapshot.active_threats, 2);
    assert_eq!(snapshot.alerts.len(), 2);
    assert!(snapshot.alerts.iter().any(|a| a.severity == Severity::Critical));

    // 25 + 15 + 3 severity weight, 3 failed ops x2, 1 high-risk op x5.
    assert_eq!(snapshot.risk_score, 54);
    assert!(
        snapshot.recommendations[0].contains("Immediate investigation"),
        "critical incidents lead the recommendations"
    );
}

#[tokio::test]
async fn rollup_is_scoped_to_the_organization() {
    let db = setup().await;
    let security = SurrealSecurityEventStore::new(db.clone());
    let monitor = SecurityMonitor::new(
        SurrealAuditEventStore::new(db.clone()),
        SurrealSecurityEventStore::new(db),
    );
    let org = Uuid::new_v4();
    let other = Uuid::new_v4();

    security
        .append(incident(other, Severity::Critical, "elsewhere"))
        .await
        .unwrap();

    let snapshot = monitor.monitor(Some(org)).await.unwrap();
    assert_eq!(snapshot.active_threats, 0);
    assert_eq!(snapshot.risk_score, 0);
}
