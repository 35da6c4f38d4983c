//! Process-wide tracing setup
//!
//! `RUST_LOG` wins when set; otherwise `default_level` (from `LOG_LEVEL`)
//! applies to this crate and noisy dependencies are held at `warn`.
//! Records emitted through the `log` facade are forwarded into tracing.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Dependencies that are chatty at info level
const QUIET_TARGETS: &[&str] = &["chromiumoxide", "tungstenite", "hyper", "reqwest", "redis"];

fn default_filter(default_level: &str) -> EnvFilter {
    let mut directives = default_level.to_string();
    for target in QUIET_TARGETS {
        directives.push_str(&format!(",{target}=warn"));
    }
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Returns `false` when one was already installed (tests, embedding).
pub fn init(default_level: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
