// Access-mode resolution
//   Each AccessMode maps to a fixed set of named options, the same way a
//   GDAL-backed workflow would export environment variables before opening a
//   remote dataset. Here the options never touch the process environment:
//   they are parsed into an explicit RemoteSettings scoped to a single run.

use crate::error::{BenchError, BenchResult};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

pub const HEADER_PREFETCH_BYTES: &str = "HEADER_PREFETCH_BYTES";
pub const RANGE_MERGE_GAP_BYTES: &str = "RANGE_MERGE_GAP_BYTES";
pub const MAX_REQUEST_BYTES: &str = "MAX_REQUEST_BYTES";
pub const REQUEST_TIMEOUT_MS: &str = "REQUEST_TIMEOUT_MS";
pub const UNSIGNED_REQUESTS: &str = "UNSIGNED_REQUESTS";
pub const PROBE_SIDECAR_FILES: &str = "PROBE_SIDECAR_FILES";
pub const WORKER_POOL_SIZE: &str = "WORKER_POOL_SIZE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessMode {
    /// Download the whole object to disk, then open it locally.
    LocalDownload,
    /// Read remotely with naive settings: small header fetch, one request per
    /// tile, sidecar probing on.
    RemoteDefault,
    /// Read remotely with tuned settings: large header prefetch, coalesced
    /// range requests, no sidecar probing, unsigned requests.
    RemoteTuned,
    /// Tuned settings plus deferred chunked materialization on a worker pool.
    RemoteChunked,
}

impl AccessMode {
    pub const ALL: [AccessMode; 4] = [
        AccessMode::LocalDownload,
        AccessMode::RemoteDefault,
        AccessMode::RemoteTuned,
        AccessMode::RemoteChunked,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AccessMode::LocalDownload => "local-download",
            AccessMode::RemoteDefault => "remote-default",
            AccessMode::RemoteTuned => "remote-tuned",
            AccessMode::RemoteChunked => "remote-chunked",
        }
    }
}

impl Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AccessMode {
    type Err = BenchError;

    fn from_str(s: &str) -> BenchResult<Self> {
        match s {
            "local-download" => Ok(AccessMode::LocalDownload),
            "remote-default" => Ok(AccessMode::RemoteDefault),
            "remote-tuned" => Ok(AccessMode::RemoteTuned),
            "remote-chunked" => Ok(AccessMode::RemoteChunked),
            other => Err(BenchError::Configuration(format!(
                "unknown access mode: {other:?}"
            ))),
        }
    }
}

/// One named env-style setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOption {
    pub name: &'static str,
    pub value: String,
}

impl ConfigOption {
    fn new(name: &'static str, value: impl ToString) -> Self {
        Self {
            name,
            value: value.to_string(),
        }
    }
}

impl Display for ConfigOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Resolve an access mode into its full option set. Deterministic and
/// idempotent; every mode yields every option name exactly once.
pub fn resolve(mode: AccessMode) -> Vec<ConfigOption> {
    let (prefetch, merge_gap, max_request, unsigned, probe, pool) = match mode {
        AccessMode::LocalDownload => (65_536u64, 0u64, 16_777_216u64, true, false, 1usize),
        AccessMode::RemoteDefault => (16_384, 0, 16_777_216, false, true, 1),
        AccessMode::RemoteTuned => (524_288, 131_072, 33_554_432, true, false, 1),
        AccessMode::RemoteChunked => (524_288, 131_072, 33_554_432, true, false, 4),
    };
    vec![
        ConfigOption::new(HEADER_PREFETCH_BYTES, prefetch),
        ConfigOption::new(RANGE_MERGE_GAP_BYTES, merge_gap),
        ConfigOption::new(MAX_REQUEST_BYTES, max_request),
        ConfigOption::new(REQUEST_TIMEOUT_MS, 30_000),
        ConfigOption::new(UNSIGNED_REQUESTS, unsigned),
        ConfigOption::new(PROBE_SIDECAR_FILES, probe),
        ConfigOption::new(WORKER_POOL_SIZE, pool),
    ]
}

/// Resolve a mode given by name, failing before anything else happens.
pub fn resolve_name(name: &str) -> BenchResult<Vec<ConfigOption>> {
    Ok(resolve(name.parse()?))
}

/// Explicit per-run settings, built from a resolved option set. Replaces the
/// process-wide environment configuration a GDAL workflow would use, so runs
/// cannot interfere with each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub header_prefetch: u64,
    pub merge_gap: u64,
    pub max_request: u64,
    pub timeout: Duration,
    pub unsigned_requests: bool,
    pub probe_sidecars: bool,
    pub pool_size: usize,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            header_prefetch: 16_384,
            merge_gap: 0,
            max_request: 16_777_216,
            timeout: Duration::from_millis(30_000),
            unsigned_requests: false,
            probe_sidecars: true,
            pool_size: 1,
        }
    }
}

impl RemoteSettings {
    pub fn from_options(options: &[ConfigOption]) -> BenchResult<Self> {
        let mut settings = Self::default();
        for option in options {
            match option.name {
                HEADER_PREFETCH_BYTES => settings.header_prefetch = parse_number(option)?,
                RANGE_MERGE_GAP_BYTES => settings.merge_gap = parse_number(option)?,
                MAX_REQUEST_BYTES => settings.max_request = parse_number(option)?,
                REQUEST_TIMEOUT_MS => {
                    settings.timeout = Duration::from_millis(parse_number(option)?)
                }
                UNSIGNED_REQUESTS => settings.unsigned_requests = parse_bool(option)?,
                PROBE_SIDECAR_FILES => settings.probe_sidecars = parse_bool(option)?,
                WORKER_POOL_SIZE => settings.pool_size = parse_number(option)? as usize,
                name => {
                    return Err(BenchError::Configuration(format!(
                        "unknown option name: {name:?}"
                    )))
                }
            }
        }
        Ok(settings)
    }

    pub fn for_mode(mode: AccessMode) -> BenchResult<Self> {
        Self::from_options(&resolve(mode))
    }
}

fn parse_number(option: &ConfigOption) -> BenchResult<u64> {
    option.value.parse().map_err(|_| {
        BenchError::Configuration(format!("bad value for {}: {:?}", option.name, option.value))
    })
}

fn parse_bool(option: &ConfigOption) -> BenchResult<bool> {
    match option.value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(BenchError::Configuration(format!(
            "bad value for {}: {other:?}",
            option.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_resolves_to_a_full_option_set() {
        for mode in AccessMode::ALL {
            let options = resolve(mode);
            assert!(!options.is_empty());
            assert_eq!(options.len(), 7);
        }
    }

    #[test]
    fn resolution_is_deterministic_and_idempotent() {
        for mode in AccessMode::ALL {
            assert_eq!(resolve(mode), resolve(mode));
            let settings = RemoteSettings::for_mode(mode).unwrap();
            assert_eq!(settings, RemoteSettings::for_mode(mode).unwrap());
        }
    }

    #[test]
    fn tuned_mode_disables_probing_and_signing() {
        let settings = RemoteSettings::for_mode(AccessMode::RemoteTuned).unwrap();
        assert!(!settings.probe_sidecars);
        assert!(settings.unsigned_requests);
        assert!(settings.merge_gap > 0);
        let default = RemoteSettings::for_mode(AccessMode::RemoteDefault).unwrap();
        assert!(settings.header_prefetch > default.header_prefetch);
    }

    #[test]
    fn chunked_mode_requests_a_worker_pool() {
        let settings = RemoteSettings::for_mode(AccessMode::RemoteChunked).unwrap();
        assert!(settings.pool_size > 1);
    }

    #[test]
    fn unknown_mode_is_a_configuration_error() {
        let err = resolve_name("turbo").unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
        let err = "".parse::<AccessMode>().unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn bad_option_values_are_rejected() {
        let options = vec![ConfigOption {
            name: HEADER_PREFETCH_BYTES,
            value: "lots".to_string(),
        }];
        assert!(matches!(
            RemoteSettings::from_options(&options),
            Err(BenchError::Configuration(_))
        ));

        let options = vec![ConfigOption {
            name: UNSIGNED_REQUESTS,
            value: "maybe".to_string(),
        }];
        assert!(matches!(
            RemoteSettings::from_options(&options),
            Err(BenchError::Configuration(_))
        ));
    }

    #[test]
    fn mode_names_round_trip() {
        for mode in AccessMode::ALL {
            assert_eq!(mode.name().parse::<AccessMode>().unwrap(), mode);
        }
    }
}
