//! Integration tests for request-path threat evaluation.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

use vigil_core::metadata::Metadata;
use vigil_core::models::audit::AuditAction;
use vigil_core::models::security::{SecurityEventType, Severity};
use vigil_core::store::{SecurityEventFilter, SecurityEventStore, Pagination};
use vigil_db::store::{SurrealAuditEventStore, SurrealSecurityEventStore};
use vigil_engine::{
    AuditRecorder, EngineConfig, RequestContext, StaticThreatIntel, ThreatDetector, ThreatRequest,
};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    vigil_db::run_migrations(&db).await.unwrap();
    db
}

fn detector(
    db: &Surreal<Db>,
    intel: StaticThreatIntel,
) -> ThreatDetector<SurrealAuditEventStore<Db>, SurrealSecurityEventStore<Db>, StaticThreatIntel> {
    ThreatDetector::new(AuditRecorder::new(
        SurrealAuditEventStore::new(db.clone()),
        SurrealSecurityEventStore::new(db.clone()),
        intel,
        EngineConfig::default(),
    ))
}

#[tokio::test]
async fn empty_request_scores_zero() {
    let db = setup().await;
    let detector = detector(&db, StaticThreatIntel::new());

    let assessment = detector.evaluate(ThreatRequest::default()).await.unwrap();

    assert_eq!(assessment.risk, 0);
    assert!(!assessment.detected);
    assert!(!assessment.should_block);
    assert!(assessment.threat_type.is_none());
    assert!(assessment.security_event_id.is_none());
}

#[tokio::test]
async fn brute_force_fires_on_the_fifth_attempt() {
    let db = setup().await;
    let detector = detector(&db, StaticThreatIntel::new());
    let user = Uuid::new_v4();

    // Four recorded failures from the same address.
    for _ in 0..4 {
        detector
            .recorder()
            .log_auth(
                AuditAction::LoginFailed,
                Some(user),
                Metadata::default(),
                RequestContext {
                    ip_address: Some("10.0.0.1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    // The fifth attempt, evaluated before being recorded, counts
    // itself: 5 attempts total and 5 from this address.
    let assessment = detector
        .evaluate(ThreatRequest {
            user_id: Some(user),
            action: Some(AuditAction::Login),
            ip_address: Some("10.0.0.1".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(assessment.detected);
    assert_eq!(assessment.threat_type, Some(SecurityEventType::BruteForce));
    // 5x10 for the attempt count plus 5x15 for the same-IP run.
    assert_eq!(assessment.risk, 125);

    let incidents = detector
        .recorder()
        .security_store()
        .find(
            SecurityEventFilter {
                user_id: Some(user),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].event_type, SecurityEventType::BruteForce);
    assert_eq!(incidents[0].severity, Severity::Critical);
    assert_eq!(Some(incidents[0].id), assessment.security_event_id);
}

#[tokio::test]
async fn sustained_brute_force_blocks() {
    let db = setup().await;
    let detector = detector(&db, StaticThreatIntel::new());
    let user = Uuid::new_v4();

    for _ in 0..10 {
        detector
            .recorder()
            .log_auth(
                AuditAction::LoginFailed,
                Some(user),
                Metadata::default(),
                RequestContext {
                    ip_address: Some("10.0.0.1".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let assessment = detector
        .evaluate(ThreatRequest {
            user_id: Some(user),
            action: Some(AuditAction::Login),
            ip_address: Some("10.0.0.1".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    // Both contributions saturate at 80.
    assert_eq!(assessment.risk, 160);
    assert!(assessment.should_block);
}

#[tokio::test]
async fn malicious_ip_detects_without_blocking() {
    let db = setup().await;
    let detector = detector(&db, StaticThreatIntel::with_malicious_ips(["203.0.113.9"]));

    let assessment = detector
        .evaluate(ThreatRequest {
            ip_address: Some("203.0.113.9".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(assessment.risk, 80);
    assert!(assessment.detected);
    // Blocking needs risk strictly above 80.
    assert!(!assessment.should_block);
    assert_eq!(assessment.threat_type, Some(SecurityEventType::MaliciousIp));
}

#[tokio::test]
async fn suspicious_agent_adds_weight_but_keeps_the_ip_classification() {
    let db = setup().await;
    let detector = detector(&db, StaticThreatIntel::with_malicious_ips(["203.0.113.9"]));

    let assessment = detector
        .evaluate(ThreatRequest {
            ip_address: Some("203.0.113.9".into()),
            user_agent: Some("curl/8.5.0".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(assessment.risk, 110);
    assert!(assessment.should_block);
    assert_eq!(assessment.threat_type, Some(SecurityEventType::MaliciousIp));
}

#[tokio::test]
async fn suspicious_agent_alone_stays_below_detection() {
    let db = setup().await;
    let detector = detector(&db, StaticThreatIntel::new());

    let assessment = detector
        .evaluate(ThreatRequest {
            user_agent: Some("python-requests/2.31".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(assessment.risk, 30);
    assert!(!assessment.detected);
    assert!(assessment.security_event_id.is_none());
}

#[tokio::test]
async fn role_assignment_is_an_escalation_signal() {
    let db = setup().await;
    let detector = detector(&db, StaticThreatIntel::new());
    let user = Uuid::new_v4();

    let assessment = detector
        .evaluate(ThreatRequest {
            user_id: Some(user),
            action: Some(AuditAction::RoleAssign),
            resource: Some("SecurityRole".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    // The escalation signal contributes once even when both the action
    // and the resource match.
    assert_eq!(assessment.risk, 60);
    assert!(assessment.detected);
    assert_eq!(
        assessment.threat_type,
        Some(SecurityEventType::PrivilegeEscalation)
    );

    let incidents = detector
        .recorder()
        .security_store()
        .find(
            SecurityEventFilter {
                user_id: Some(user),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(incidents[0].severity, Severity::Medium);
}
