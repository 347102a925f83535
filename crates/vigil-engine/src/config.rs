//! Engine configuration.

/// Thresholds and windows for detection and analysis.
///
/// Defaults encode the shipped policy; tests and deployments override
/// individual fields with struct update syntax.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Brute-force lookback window in seconds (default: 900 = 15 min).
    pub brute_force_window_secs: u64,
    /// Failed attempts (including the one under evaluation) at which
    /// the brute-force signal fires (default: 5).
    pub brute_force_attempt_threshold: u32,
    /// Same-IP failed attempts beyond which the per-IP signal fires
    /// (default: 3).
    pub brute_force_ip_threshold: u32,
    /// Exfiltration lookback window in seconds (default: 3600 = 1 h).
    pub exfiltration_window_secs: u64,
    /// Exports in the window beyond which the export signal fires.
    pub export_count_threshold: u64,
    /// Reads in the window beyond which the read signal fires.
    pub read_count_threshold: u64,
    /// Export payload size in bytes considered oversized.
    pub export_size_threshold_bytes: u64,
    /// Total risk above which a threat is flagged (default: 50).
    pub detection_threshold: u32,
    /// Total risk above which the request should be blocked (default: 80).
    pub block_threshold: u32,
    /// Row cap for store queries on the request path (default: 100).
    pub query_row_cap: u64,

    /// Business hours, local to event timestamps: [start, end).
    pub business_hours_start: u32,
    pub business_hours_end: u32,
    /// Off-hours logins per user beyond which a user is flagged.
    pub off_hours_login_threshold: u64,
    /// Per-user data accesses per hour beyond which a user is flagged.
    pub hourly_access_rate_threshold: f64,
    /// Multiple of the hourly mean at which a bucket is a spike.
    pub activity_spike_factor: f64,
    /// Hour buckets below this count never spike; small windows make
    /// the mean tiny and any bucket a multiple of it (default: 10).
    pub activity_spike_min_bucket: u64,
    /// Distinct IPs per user beyond which a user is flagged.
    pub ip_diversity_threshold: u64,
    /// Event cap for one anomaly window (default: 5000).
    pub max_anomaly_events: u64,
    /// Below this many events, detection confidence is floor-pinned.
    pub min_confidence_events: usize,

    /// Event cap for one compliance report (default: 10_000).
    pub max_report_events: u64,
    /// Default report period when unspecified (default: 30 days).
    pub report_period_days: i64,

    /// Sessions unused this many days are stale (default: 30).
    pub stale_session_days: i64,
    /// Stale sessions beyond which a finding is produced (default: 5).
    pub stale_session_threshold: u64,
    /// MFA coverage percentage below which a finding is produced.
    pub mfa_coverage_threshold: f64,
    /// Security roles per user beyond which permissions are excessive.
    pub max_roles_per_user: u32,
    /// Weak-credential prevalence at which the finding turns high
    /// severity (default: 0.2 = 20%).
    pub weak_password_high_ratio: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            brute_force_window_secs: 900,
            brute_force_attempt_threshold: 5,
            brute_force_ip_threshold: 3,
            exfiltration_window_secs: 3600,
            export_count_threshold: 3,
            read_count_threshold: 100,
            export_size_threshold_bytes: 1_000_000,
            detection_threshold: 50,
            block_threshold: 80,
            query_row_cap: 100,

            business_hours_start: 6,
            business_hours_end: 22,
            off_hours_login_threshold: 2,
            hourly_access_rate_threshold: 50.0,
            activity_spike_factor: 3.0,
            activity_spike_min_bucket: 10,
            ip_diversity_threshold: 5,
            max_anomaly_events: 5000,
            min_confidence_events: 10,

            max_report_events: 10_000,
            report_period_days: 30,

            stale_session_days: 30,
            stale_session_threshold: 5,
            mfa_coverage_threshold: 80.0,
            max_roles_per_user: 3,
            weak_password_high_ratio: 0.2,
        }
    }
}
