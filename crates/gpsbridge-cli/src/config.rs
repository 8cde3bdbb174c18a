//! Bridge configuration – `~/.gpsbridge/config.toml`, `GPSBRIDGE_*`
//! environment variables, then command-line flags, later layers winning.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use gpsbridge_middleware::DEFAULT_OUTPUT_TOPIC;
use gpsbridge_types::{BridgeConfig, BridgeError};
use serde::{Deserialize, Serialize};

use crate::args::Args;

/// Layered configuration.  The five sensor parameters are optional here so
/// that any layer can supply them; [`Config::bridge_config`] enforces that
/// all of them end up set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub world_name: Option<String>,
    #[serde(default)]
    pub name_space: Option<String>,
    #[serde(default)]
    pub sensor_name: Option<String>,
    #[serde(default)]
    pub link_name: Option<String>,
    #[serde(default)]
    pub sensor_type: Option<String>,

    /// Publish topic relative to `/<name_space>`.
    #[serde(default = "default_output_topic")]
    pub output_topic: String,

    /// Listen address of the WebSocket gateway.
    #[serde(default = "default_ws_addr")]
    pub ws_addr: String,

    /// Whether to start the WebSocket gateway.
    #[serde(default = "default_gateway")]
    pub gateway: bool,
}

fn default_output_topic() -> String {
    DEFAULT_OUTPUT_TOPIC.to_string()
}
fn default_ws_addr() -> String {
    "127.0.0.1:9090".to_string()
}
fn default_gateway() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world_name: None,
            name_space: None,
            sensor_name: None,
            link_name: None,
            sensor_type: None,
            output_topic: default_output_topic(),
            ws_addr: default_ws_addr(),
            gateway: default_gateway(),
        }
    }
}

impl Config {
    /// Overlay the flags that were given on the command line.
    pub fn apply_args(&mut self, args: &Args) {
        overlay(&mut self.world_name, &args.world_name);
        overlay(&mut self.name_space, &args.name_space);
        overlay(&mut self.sensor_name, &args.sensor_name);
        overlay(&mut self.link_name, &args.link_name);
        overlay(&mut self.sensor_type, &args.sensor_type);
        if let Some(topic) = &args.output_topic {
            self.output_topic = topic.clone();
        }
        if let Some(addr) = &args.ws_addr {
            self.ws_addr = addr.clone();
        }
        if args.no_gateway {
            self.gateway = false;
        }
    }

    /// The sensor parameters, or every missing parameter name at once.
    pub fn bridge_config(&self) -> Result<BridgeConfig, BridgeError> {
        let fields = [
            ("world_name", &self.world_name),
            ("name_space", &self.name_space),
            ("sensor_name", &self.sensor_name),
            ("link_name", &self.link_name),
            ("sensor_type", &self.sensor_type),
        ];
        let missing: Vec<String> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(BridgeError::MissingParameter(missing));
        }

        let take = |v: &Option<String>| v.clone().unwrap_or_default();
        Ok(BridgeConfig {
            world_name: take(&self.world_name),
            name_space: take(&self.name_space),
            sensor_name: take(&self.sensor_name),
            link_name: take(&self.link_name),
            sensor_type: take(&self.sensor_type),
        })
    }

    /// Parsed gateway listen address.
    pub fn ws_socket_addr(&self) -> Result<SocketAddr, BridgeError> {
        self.ws_addr
            .parse()
            .map_err(|e| BridgeError::Config(format!("invalid ws_addr '{}': {e}", self.ws_addr)))
    }
}

fn overlay(target: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value {
        *target = Some(v.clone());
    }
}

/// Return the path to `~/.gpsbridge/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".gpsbridge").join("config.toml")
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, BridgeError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        BridgeError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg = toml::from_str(&raw).map_err(|e| {
        BridgeError::Config(format!("failed to parse config at {}: {e}", path.display()))
    })?;
    Ok(Some(cfg))
}

/// Apply `GPSBRIDGE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `GPSBRIDGE_WORLD_NAME` | `world_name` |
/// | `GPSBRIDGE_NAME_SPACE` | `name_space` |
/// | `GPSBRIDGE_SENSOR_NAME` | `sensor_name` |
/// | `GPSBRIDGE_LINK_NAME` | `link_name` |
/// | `GPSBRIDGE_SENSOR_TYPE` | `sensor_type` |
/// | `GPSBRIDGE_OUTPUT_TOPIC` | `output_topic` |
/// | `GPSBRIDGE_WS_ADDR` | `ws_addr` |
/// | `GPSBRIDGE_GATEWAY` | `gateway` (`true` / `false`; other values are ignored) |
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides_from(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    overlay(&mut cfg.world_name, &lookup("GPSBRIDGE_WORLD_NAME"));
    overlay(&mut cfg.name_space, &lookup("GPSBRIDGE_NAME_SPACE"));
    overlay(&mut cfg.sensor_name, &lookup("GPSBRIDGE_SENSOR_NAME"));
    overlay(&mut cfg.link_name, &lookup("GPSBRIDGE_LINK_NAME"));
    overlay(&mut cfg.sensor_type, &lookup("GPSBRIDGE_SENSOR_TYPE"));
    if let Some(v) = lookup("GPSBRIDGE_OUTPUT_TOPIC") {
        cfg.output_topic = v;
    }
    if let Some(v) = lookup("GPSBRIDGE_WS_ADDR") {
        cfg.ws_addr = v;
    }
    if let Some(v) = lookup("GPSBRIDGE_GATEWAY")
        && let Ok(enabled) = v.parse::<bool>()
    {
        cfg.gateway = enabled;
    }
}

/// Build the effective configuration for `args`: file, then environment,
/// then flags.
///
/// A file named explicitly with `--config` must exist; the default file is
/// optional.
pub fn load(args: &Args) -> Result<Config, BridgeError> {
    let mut cfg = match &args.config {
        Some(path) => load_from(path)?.ok_or_else(|| {
            BridgeError::Config(format!("config file {} not found", path.display()))
        })?,
        None => load_from(&config_path())?.unwrap_or_default(),
    };
    apply_env_overrides(&mut cfg);
    cfg.apply_args(args);
    Ok(cfg)
}
