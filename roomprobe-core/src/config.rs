//! Process configuration loaded from the environment

use crate::error::ProbeError;
use std::path::PathBuf;

/// Default room name probed when `PROBE_ROOM` is unset
pub const DEFAULT_ROOM: &str = "probe-runaway-memory";
/// Default identity the harness joins with
pub const DEFAULT_IDENTITY: &str = "server";
/// Identity of the human participant the harness looks for
pub const HUMAN_IDENTITY: &str = "human";
/// Default sampling cadence for the frame drain loop
pub const DEFAULT_SAMPLE_EVERY: u64 = 200;
/// Default interval between process-memory reports, in seconds
pub const DEFAULT_MEMORY_REPORT_SECS: u64 = 30;

/// Probe configuration
///
/// Credentials are optional at load time; their absence only becomes an
/// error when a token is actually issued.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Base address of the room signaling/admin service
    pub service_url: String,
    /// API key used to sign access tokens
    pub api_key: Option<String>,
    /// API secret used to sign access tokens
    pub api_secret: Option<String>,
    /// Room name to probe
    pub room_name: String,
    /// Identity the harness joins with
    pub identity: String,
    /// Report one diagnostic line per this many consumed frames
    pub sample_every: u64,
    /// Seconds between process-memory reports (0 disables reporting)
    pub memory_report_secs: u64,
    /// Directory for WebP snapshots of sampled frames (unset disables the hook)
    pub snapshot_dir: Option<PathBuf>,
    /// Also discover and drain the audio/microphone track
    pub audio_enabled: bool,
    /// Optional deadline in seconds for each discovery wait (unset waits forever)
    pub wait_secs: Option<u64>,
}

impl ProbeConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ProbeError> {
        let service_url = std::env::var("ROOM_SERVICE_URL").map_err(|_| {
            ProbeError::MissingConfiguration {
                field: "ROOM_SERVICE_URL".to_string(),
            }
        })?;

        let sample_every = env_parse("PROBE_SAMPLE_EVERY")?.unwrap_or(DEFAULT_SAMPLE_EVERY);
        if sample_every == 0 {
            return Err(ProbeError::InvalidConfiguration {
                field: "PROBE_SAMPLE_EVERY".to_string(),
                reason: "sampling cadence must be at least 1".to_string(),
            });
        }

        Ok(Self {
            service_url,
            api_key: env_opt("API_KEY"),
            api_secret: env_opt("API_SECRET"),
            room_name: env_opt("PROBE_ROOM").unwrap_or_else(|| DEFAULT_ROOM.to_string()),
            identity: env_opt("PROBE_IDENTITY").unwrap_or_else(|| DEFAULT_IDENTITY.to_string()),
            sample_every,
            memory_report_secs: env_parse("PROBE_MEMORY_REPORT_SECS")?
                .unwrap_or(DEFAULT_MEMORY_REPORT_SECS),
            snapshot_dir: env_opt("PROBE_SNAPSHOT_DIR").map(PathBuf::from),
            audio_enabled: env_flag("PROBE_AUDIO"),
            wait_secs: env_parse("PROBE_WAIT_SECS")?,
        })
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> bool {
    matches!(
        env_opt(key).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

fn env_parse(key: &str) -> Result<Option<u64>, ProbeError> {
    match env_opt(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ProbeError::InvalidConfiguration {
                field: key.to_string(),
                reason: format!("expected an integer, got {:?}: {}", raw, e),
            }),
    }
}
