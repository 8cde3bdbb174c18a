//! Simulator NavSat → middleware NavSatFix translation.
//!
//! [`translate`] is a pure function of its inputs: it holds no state, never
//! fails, and may be called concurrently from any number of threads.

use gpsbridge_types::{
    CovarianceType, FixStatus, Header, MessageInfo, NavSatFix, NavSatStatus, SimNavSat, Time,
};

/// Scoped-name delimiter used by the simulator (`drone1::base_link::gps0`).
pub const SIM_DELIMITER: &str = "::";

/// Path delimiter used by the middleware (`drone1/base_link/gps0`).
pub const MIDDLEWARE_DELIMITER: &str = "/";

/// Replace every occurrence of `old` in `input` with `new`.
///
/// Matches are found left to right and never overlap, so `"::::"` holds two
/// matches. An empty `old` matches nothing and returns `input` unchanged.
pub fn replace_delimiter(input: &str, old: &str, new: &str) -> String {
    if old.is_empty() {
        return input.to_string();
    }

    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(old) {
        output.push_str(&rest[..pos]);
        output.push_str(new);
        rest = &rest[pos + old.len()..];
    }
    output.push_str(rest);
    output
}

/// Convert a simulator frame identifier to the middleware convention.
pub fn to_middleware_frame_id(frame_id: &str) -> String {
    replace_delimiter(frame_id, SIM_DELIMITER, MIDDLEWARE_DELIMITER)
}

/// Translate one simulator NavSat message into a middleware [`NavSatFix`].
///
/// The simulator carries no covariance or fix-quality data, so every fix is
/// reported with [`CovarianceType::Unknown`] and [`FixStatus::Fix`].
/// Coordinates are copied as-is, including NaN and infinities.
pub fn translate(msg: &SimNavSat, _info: &MessageInfo) -> NavSatFix {
    NavSatFix {
        header: Header {
            stamp: Time::from(msg.header.stamp),
            frame_id: to_middleware_frame_id(&msg.frame_id),
        },
        status: NavSatStatus {
            status: FixStatus::Fix,
            service: 0,
        },
        latitude: msg.latitude_deg,
        longitude: msg.longitude_deg,
        altitude: msg.altitude,
        position_covariance: [0.0; 9],
        position_covariance_type: CovarianceType::Unknown,
    }
}
