use std::time::Duration;

use songreel_core::payload::{DEFAULT_SEGMENTS, MAX_SEGMENTS};

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of concurrent worker tasks (default: `2`, minimum `1`).
    pub worker_count: usize,
    /// Segments per job when the payload does not specify any (default: `12`).
    pub default_segments: u32,
    /// Interval between keep-alive pings to subscribers (default: 15 s).
    pub heartbeat_interval: Duration,
    /// How long shutdown waits for workers to finish their current job
    /// before aborting them (default: 30 s).
    pub shutdown_timeout: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default |
    /// |--------------------------|---------|
    /// | `WORKER_COUNT`           | `2`     |
    /// | `DEFAULT_SEGMENTS`       | `12`    |
    /// | `HEARTBEAT_INTERVAL_SECS`| `15`    |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `30`    |
    pub fn from_env() -> Self {
        let worker_count: usize = std::env::var("WORKER_COUNT")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("WORKER_COUNT must be a valid usize");

        let default_segments: u32 = std::env::var("DEFAULT_SEGMENTS")
            .unwrap_or_else(|_| DEFAULT_SEGMENTS.to_string())
            .parse()
            .expect("DEFAULT_SEGMENTS must be a valid u32");

        let heartbeat_interval_secs: u64 = std::env::var("HEARTBEAT_INTERVAL_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("HEARTBEAT_INTERVAL_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            worker_count: worker_count.max(1),
            default_segments: default_segments.clamp(1, MAX_SEGMENTS),
            heartbeat_interval: Duration::from_secs(heartbeat_interval_secs.max(1)),
            shutdown_timeout: Duration::from_secs(shutdown_timeout_secs),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            default_segments: DEFAULT_SEGMENTS,
            heartbeat_interval: Duration::from_secs(15),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}
