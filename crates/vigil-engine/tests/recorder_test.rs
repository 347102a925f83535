//! Integration tests for the audit recorder over a real store.

use chrono::Duration;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

use vigil_core::metadata::{KEY_FAILED_ATTEMPTS, Metadata};
use vigil_core::models::audit::{AuditAction, ComplianceFlag};
use vigil_core::models::security::{CreateSecurityEvent, SecurityEventType, Severity};
use vigil_core::risk::DataAccessKind;
use vigil_core::store::{AuditEventFilter, Pagination, SecurityEventStore};
use vigil_db::store::{SurrealAuditEventStore, SurrealSecurityEventStore};
use vigil_engine::{AuditRecorder, EngineConfig, RequestContext, StaticThreatIntel};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    vigil_db::run_migrations(&db).await.unwrap();
    db
}

fn recorder(
    db: &Surreal<Db>,
    intel: StaticThreatIntel,
) -> AuditRecorder<SurrealAuditEventStore<Db>, SurrealSecurityEventStore<Db>, StaticThreatIntel> {
    AuditRecorder::new(
        SurrealAuditEventStore::new(db.clone()),
        SurrealSecurityEventStore::new(db.clone()),
        intel,
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn log_auth_scores_and_tags_the_event() {
    let db = setup().await;
    let recorder = recorder(&db, StaticThreatIntel::new());
    let user = Uuid::new_v4();

    let id = recorder
        .log_auth(
            AuditAction::LoginFailed,
            Some(user),
            Metadata::new().with(KEY_FAILED_ATTEMPTS, 4),
            RequestContext {
                ip_address: Some("10.0.0.1".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let events = recorder
        .query(
            AuditEventFilter {
                user_id: Some(user),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];

    assert_eq!(event.id, id);
    assert_eq!(event.action, AuditAction::LoginFailed);
    assert!(!event.success);
    // 30 base + 20 for more than three failed attempts.
    assert_eq!(event.risk_score, 50);
    assert_eq!(
        event.compliance_flags,
        vec![ComplianceFlag::Soc2, ComplianceFlag::Gdpr]
    );
    // Failed logins fall under the default retention class.
    assert_eq!(event.retention_until - event.timestamp, Duration::days(730));
}

#[tokio::test]
async fn log_auth_adds_malicious_ip_weight() {
    let db = setup().await;
    let recorder = recorder(&db, StaticThreatIntel::with_malicious_ips(["203.0.113.9"]));
    let user = Uuid::new_v4();

    recorder
        .log_auth(
            AuditAction::Login,
            Some(user),
            Metadata::default(),
            RequestContext {
                ip_address: Some("203.0.113.9".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let events = recorder
        .query(
            AuditEventFilter {
                user_id: Some(user),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    // 10 base + 50 malicious IP.
    assert_eq!(events[0].risk_score, 60);
}

#[tokio::test]
async fn log_data_access_flags_all_three_regimes() {
    let db = setup().await;
    let recorder = recorder(&db, StaticThreatIntel::new());
    let user = Uuid::new_v4();

    recorder
        .log_data_access(
            DataAccessKind::Export,
            "User",
            Some("user-7".into()),
            Some(user),
            None,
            Metadata::default(),
        )
        .await
        .unwrap();

    let events = recorder
        .query(
            AuditEventFilter {
                user_id: Some(user),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    let event = &events[0];

    assert_eq!(event.action, AuditAction::DataExport);
    // 30 export + 20 sensitive resource.
    assert_eq!(event.risk_score, 50);
    assert_eq!(
        event.compliance_flags,
        vec![
            ComplianceFlag::Gdpr,
            ComplianceFlag::Hipaa,
            ComplianceFlag::Soc2
        ]
    );
}

#[tokio::test]
async fn query_page_size_is_capped() {
    let db = setup().await;
    let recorder = recorder(&db, StaticThreatIntel::new());
    let user = Uuid::new_v4();

    for _ in 0..105 {
        recorder
            .log_auth(
                AuditAction::Login,
                Some(user),
                Metadata::default(),
                RequestContext::default(),
            )
            .await
            .unwrap();
    }

    let events = recorder
        .query(
            AuditEventFilter {
                user_id: Some(user),
                ..Default::default()
            },
            Pagination::first(10_000),
        )
        .await
        .unwrap();
    assert_eq!(events.len(), 100);
}

#[tokio::test]
async fn security_event_gets_a_correlated_audit_entry() {
    let db = setup().await;
    let recorder = recorder(&db, StaticThreatIntel::new());
    let user = Uuid::new_v4();

    let event = recorder
        .log_security_event(CreateSecurityEvent {
            event_type: SecurityEventType::PrivilegeEscalation,
            severity: Severity::High,
            title: "Unexpected role grant".into(),
            description: None,
            user_id: Some(user),
            organization_id: None,
            detected_by: "system".into(),
            risk_score: 0,
            metadata: Metadata::default(),
        })
        .await
        .unwrap();

    // Risk is recomputed from severity and type, never trusted from
    // the caller.
    assert_eq!(event.risk_score, 80);

    // The correlated audit entry points back at the incident. The two
    // writes are sequential, not atomic: the incident is authoritative
    // and the trail entry is best-effort, so readers of the trail may
    // briefly trail the incident store.
    let trail = recorder
        .query(
            AuditEventFilter {
                action_contains: Some("SECURITY_EVENT".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].resource_id.as_deref(), Some(event.id.to_string().as_str()));
    assert_eq!(trail[0].user_id, Some(user));
    assert_eq!(trail[0].risk_score, 80);
    // Security events carry the three-year retention class.
    assert_eq!(
        trail[0].retention_until - trail[0].timestamp,
        Duration::days(3 * 365)
    );

    let incidents = recorder
        .security_store()
        .find(Default::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].id, event.id);
}
