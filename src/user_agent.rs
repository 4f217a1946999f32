//! User-Agent selection for outbound requests.
//!
//! The transport asks a [`UserAgentProvider`] once per attempt, so a retry may
//! go out under a different identifier than the first try.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;

/// Desktop browser identifiers (Chrome, Firefox, Safari, Edge).
pub const BROWSER_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:132.0) Gecko/20100101 Firefox/132.0",
    // Firefox on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:132.0) Gecko/20100101 Firefox/132.0",
    // Safari on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.2 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    // Edge
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
    // Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Supplies the `User-Agent` header value for each request attempt.
pub trait UserAgentProvider: Send + Sync {
    /// Returns the identifier for the next attempt.
    fn next(&self) -> String;
}

/// Uniform random choice over [`BROWSER_USER_AGENTS`] on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUserAgentPool;

impl UserAgentProvider for RandomUserAgentPool {
    fn next(&self) -> String {
        BROWSER_USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default()
            .to_string()
    }
}

/// Cycles through a fixed list in order. Useful where tests need to know
/// which identifier a request carried.
#[derive(Debug)]
pub struct RoundRobinUserAgents {
    agents: Vec<String>,
    cursor: AtomicUsize,
}

impl RoundRobinUserAgents {
    /// Creates a cycling provider. An empty list yields empty strings.
    #[must_use]
    pub fn new(agents: Vec<String>) -> Self {
        Self {
            agents,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl UserAgentProvider for RoundRobinUserAgents {
    fn next(&self) -> String {
        if self.agents.is_empty() {
            return String::new();
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        self.agents[index].clone()
    }
}

/// Always returns the same identifier.
#[derive(Debug, Clone)]
pub struct FixedUserAgent(pub String);

impl UserAgentProvider for FixedUserAgent {
    fn next(&self) -> String {
        self.0.clone()
    }
}

/// Resolves a configured user-agent setting to a provider.
///
/// - `None` or `"random"`: random browser identifier per attempt
/// - `"rotate"`: browser identifiers in fixed order
/// - anything else: that literal string on every request
#[must_use]
pub fn provider_from_setting(setting: Option<&str>) -> Box<dyn UserAgentProvider> {
    match setting {
        None | Some("random") => Box::new(RandomUserAgentPool),
        Some("rotate") => Box::new(RoundRobinUserAgents::new(
            BROWSER_USER_AGENTS.iter().map(|ua| (*ua).to_string()).collect(),
        )),
        Some(custom) => Box::new(FixedUserAgent(custom.to_string())),
    }
}
