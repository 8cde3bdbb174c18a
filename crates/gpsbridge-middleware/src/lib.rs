//! `gpsbridge-middleware` – simulator NavSat to middleware NavSatFix bridge.
//!
//! Relays positioning fixes from a simulated sensor bus into a robotics
//! middleware bus, translating between the two message schemas.
//!
//! # Modules
//!
//! - [`topic`] – derives the simulator subscription topic from the five
//!   [`BridgeConfig`][gpsbridge_types::BridgeConfig] fields.
//! - [`translate`] – pure per-message translation, including the `::` → `/`
//!   frame-id rewrite.
//! - [`bus`] – typed, string-keyed publish/subscribe bus built on Tokio
//!   broadcast channels.
//! - [`adapter`] – the [`SimTransport`] and [`FixPublisher`] seams.
//! - [`gps_bridge`] – [`GpsBridge`], which wires a subscription to the
//!   translator and publishes the result.
//! - [`ws_gateway`] – rosbridge-style WebSocket front end for both buses.

pub mod adapter;
pub mod bus;
pub mod gps_bridge;
pub mod topic;
pub mod translate;
pub mod ws_gateway;

pub use adapter::{FixPublisher, SimTransport};
pub use bus::{SimEnvelope, TopicBus, TopicReceiver};
pub use gps_bridge::{GpsBridge, DEFAULT_OUTPUT_TOPIC};
pub use topic::{resolve, ResolvedTopic};
pub use translate::{replace_delimiter, translate};
pub use ws_gateway::WsGateway;
