//! VIGIL Engine — audit recording, risk monitoring, and compliance
//! analysis over an append-only event store.
//!
//! All components are generic over the `vigil-core` store traits so the
//! engine has no dependency on the database crate. Everything is
//! stateless with respect to in-process memory: concurrent detections
//! and batch analyses never share mutable state.

pub mod anomaly;
pub mod cancel;
pub mod compliance;
pub mod config;
pub mod intel;
pub mod monitor;
pub mod recorder;
pub mod threat;
pub mod vulnerability;

pub use anomaly::{Anomaly, AnomalyDetector, AnomalyReport, AnomalyType, RiskLevel};
pub use cancel::CancelFlag;
pub use compliance::ComplianceReporter;
pub use config::EngineConfig;
pub use intel::StaticThreatIntel;
pub use monitor::{SecurityAlert, SecurityMonitor, SecuritySnapshot};
pub use recorder::{AuditRecorder, RequestContext};
pub use threat::{ThreatAssessment, ThreatDetector, ThreatRequest};
pub use vulnerability::{ScanOutcome, VulnerabilityScanner};
