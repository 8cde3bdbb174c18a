use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Nanoseconds in one second.
const NSEC_PER_SEC: i128 = 1_000_000_000;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// The five parameters that locate a NavSat sensor inside a simulated world.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// e.g. "default"
    pub world_name: String,
    /// Model name of the vehicle carrying the sensor, e.g. "drone1".
    pub name_space: String,
    /// Nested sensor model name, e.g. "gps0".
    pub sensor_name: String,
    /// Link the sensor is attached to, e.g. "base_link".
    pub link_name: String,
    /// Sensor element name, e.g. "navsat_sensor".
    pub sensor_type: String,
}

// ---------------------------------------------------------------------------
// Simulator schema
// ---------------------------------------------------------------------------

/// Simulator timestamp: signed seconds plus signed nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimTime {
    #[serde(default)]
    pub sec: i64,
    #[serde(default)]
    pub nsec: i32,
}

/// One key/values pair of a simulator header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimHeaderEntry {
    pub key: String,
    #[serde(default)]
    pub value: Vec<String>,
}

/// Simulator message header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimHeader {
    #[serde(default)]
    pub stamp: SimTime,
    #[serde(default)]
    pub data: Vec<SimHeaderEntry>,
}

/// Positioning fix as published by the simulator's NavSat sensor.
///
/// `frame_id` uses the simulator's scoped-name delimiter (`"::"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimNavSat {
    #[serde(default)]
    pub header: SimHeader,
    #[serde(default)]
    pub frame_id: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude: f64,
    /// Velocities in the ENU frame (m/s). Not carried by [`NavSatFix`].
    #[serde(default)]
    pub velocity_east: f64,
    #[serde(default)]
    pub velocity_north: f64,
    #[serde(default)]
    pub velocity_up: f64,
}

/// Transport-level routing information delivered alongside every simulator
/// message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub topic: String,
    /// e.g. "ignition.msgs.NavSat"
    pub msg_type: String,
    #[serde(default)]
    pub partition: String,
    #[serde(default)]
    pub intra_process: bool,
}

// ---------------------------------------------------------------------------
// Middleware schema
// ---------------------------------------------------------------------------

/// Middleware timestamp: seconds plus nanoseconds in `0..1_000_000_000`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    /// The stamp as a wall-clock instant, for logging.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.sec), self.nanosec)
    }
}

impl From<SimTime> for Time {
    /// Normalises nanoseconds into `0..1e9`, carrying into seconds. Stamps
    /// beyond the `i32` seconds range saturate to the nearest bound.
    fn from(stamp: SimTime) -> Self {
        let total = i128::from(stamp.sec) * NSEC_PER_SEC + i128::from(stamp.nsec);
        let sec = total.div_euclid(NSEC_PER_SEC);

        if sec > i128::from(i32::MAX) {
            return Time { sec: i32::MAX, nanosec: 999_999_999 };
        }
        if sec < i128::from(i32::MIN) {
            return Time { sec: i32::MIN, nanosec: 0 };
        }

        Time {
            sec: sec as i32,
            nanosec: total.rem_euclid(NSEC_PER_SEC) as u32,
        }
    }
}

/// Middleware message header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Time,
    /// Frame identifier, `/`-delimited.
    pub frame_id: String,
}

/// How the position covariance of a [`NavSatFix`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceType {
    Unknown,
    Approximated,
    DiagonalKnown,
    Known,
}

impl CovarianceType {
    /// Numeric code used on the middleware wire.
    pub fn code(self) -> u8 {
        match self {
            CovarianceType::Unknown => 0,
            CovarianceType::Approximated => 1,
            CovarianceType::DiagonalKnown => 2,
            CovarianceType::Known => 3,
        }
    }
}

/// Satellite fix quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    NoFix,
    Fix,
    SbasFix,
    GbasFix,
}

impl FixStatus {
    /// Numeric code used on the middleware wire.
    pub fn code(self) -> i8 {
        match self {
            FixStatus::NoFix => -1,
            FixStatus::Fix => 0,
            FixStatus::SbasFix => 1,
            FixStatus::GbasFix => 2,
        }
    }
}

/// Fix status plus the bitmask of satellite services used (0 when unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavSatStatus {
    pub status: FixStatus,
    pub service: u16,
}

/// Positioning fix in the middleware's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavSatFix {
    pub header: Header,
    pub status: NavSatStatus,
    /// Degrees, positive north of the equator.
    pub latitude: f64,
    /// Degrees, positive east of the prime meridian.
    pub longitude: f64,
    /// Metres above the WGS 84 ellipsoid.
    pub altitude: f64,
    /// Row-major ENU covariance (m^2).
    pub position_covariance: [f64; 9],
    pub position_covariance_type: CovarianceType,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type shared by the bridge's collaborators. The translation core
/// itself never fails.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeError {
    #[error("Missing required parameter(s): {}", .0.join(", "))]
    MissingParameter(Vec<String>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("No subscribers for topic {0}")]
    NoSubscribers(String),

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),
}
