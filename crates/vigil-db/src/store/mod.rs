//! SurrealDB store implementations.

mod audit_event;
mod compliance_report;
mod security_event;

pub use audit_event::SurrealAuditEventStore;
pub use compliance_report::SurrealComplianceReportStore;
pub use security_event::SurrealSecurityEventStore;
