//! Subscription topic resolution.
//!
//! The simulator publishes a NavSat sensor's readings on a topic scoped by
//! the world, the vehicle model, the nested sensor model, the link and the
//! sensor element:
//!
//! ```text
//! world/<world>/model/<namespace>/model/<sensor>/link/<link>/sensor/<type>/navsat
//! ```

use std::fmt;

use gpsbridge_types::BridgeConfig;

/// A fully qualified simulator topic derived from a [`BridgeConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedTopic(String);

impl ResolvedTopic {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the NavSat subscription topic for `config`.
///
/// Values are substituted verbatim: nothing is escaped or validated, so an
/// empty field yields an empty path segment.
pub fn resolve(config: &BridgeConfig) -> ResolvedTopic {
    ResolvedTopic(format!(
        "world/{}/model/{}/model/{}/link/{}/sensor/{}/navsat",
        config.world_name,
        config.name_space,
        config.sensor_name,
        config.link_name,
        config.sensor_type,
    ))
}
