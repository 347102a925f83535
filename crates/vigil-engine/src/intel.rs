//! Built-in threat-intelligence oracle.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use vigil_core::VigilResult;
use vigil_core::store::ThreatIntel;

/// Automated-client fingerprints in user-agent strings.
static SUSPICIOUS_UA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bot|crawler|spider|scraper|curl|wget|python|java")
        .expect("suspicious UA pattern is valid")
});

/// In-memory [`ThreatIntel`] backed by a static IP denylist and a fixed
/// user-agent pattern. Production deployments swap in a feed-backed
/// oracle; the trait boundary is the same either way.
#[derive(Debug, Clone, Default)]
pub struct StaticThreatIntel {
    malicious_ips: HashSet<String>,
}

impl StaticThreatIntel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_malicious_ips<I, S>(ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            malicious_ips: ips.into_iter().map(Into::into).collect(),
        }
    }
}

impl ThreatIntel for StaticThreatIntel {
    async fn is_known_malicious_ip(&self, ip: &str) -> VigilResult<bool> {
        Ok(self.malicious_ips.contains(ip))
    }

    fn is_suspicious_user_agent(&self, user_agent: &str) -> bool {
        SUSPICIOUS_UA.is_match(user_agent)
    }
}
