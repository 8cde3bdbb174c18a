//! rosbridge-style WebSocket gateway.
//!
//! This module provides [`WsGateway`], which:
//!
//! 1. **Ingests** `publish` frames carrying simulator NavSat messages and
//!    puts them on the simulation bus, where a [`GpsBridge`] subscribed to the
//!    frame's topic picks them up.
//!
//! 2. **Serves** every translated fix published on the bridge's output topic
//!    back to all connected clients as a `publish` frame.
//!
//! Frames follow the rosbridge JSON layout:
//!
//! ```json
//! {"op": "publish", "topic": "world/.../navsat", "msg": { ... }}
//! ```
//!
//! [`GpsBridge`]: crate::gps_bridge::GpsBridge

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use gpsbridge_types::{BridgeError, Header, MessageInfo, NavSatFix, SimNavSat};
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::bus::{SimEnvelope, TopicBus};

/// Message type reported in the [`MessageInfo`] of ingested frames.
pub const SIM_NAVSAT_TYPE: &str = "ignition.msgs.NavSat";

#[derive(Serialize)]
struct PublishFrame<'a> {
    op: &'static str,
    topic: &'a str,
    msg: WireNavSatFix<'a>,
}

/// `sensor_msgs/NavSatFix` as rosbridge clients decode it: status and
/// covariance type travel as their integer codes.
#[derive(Serialize)]
struct WireNavSatFix<'a> {
    header: &'a Header,
    status: WireNavSatStatus,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    position_covariance: [f64; 9],
    position_covariance_type: u8,
}

#[derive(Serialize)]
struct WireNavSatStatus {
    status: i8,
    service: u16,
}

impl<'a> From<&'a NavSatFix> for WireNavSatFix<'a> {
    fn from(fix: &'a NavSatFix) -> Self {
        Self {
            header: &fix.header,
            status: WireNavSatStatus {
                status: fix.status.status.code(),
                service: fix.status.service,
            },
            latitude: fix.latitude,
            longitude: fix.longitude,
            altitude: fix.altitude,
            position_covariance: fix.position_covariance,
            position_covariance_type: fix.position_covariance_type.code(),
        }
    }
}

/// WebSocket front end for both buses of the bridge.
#[derive(Clone)]
pub struct WsGateway {
    sim_bus: TopicBus<SimEnvelope>,
    fix_bus: TopicBus<NavSatFix>,
    fix_topic: String,
}

impl WsGateway {
    /// Create a gateway that ingests into `sim_bus` and streams fixes
    /// published on `fix_topic` of `fix_bus`.
    pub fn new(
        sim_bus: TopicBus<SimEnvelope>,
        fix_bus: TopicBus<NavSatFix>,
        fix_topic: impl Into<String>,
    ) -> Self {
        Self {
            sim_bus,
            fix_bus,
            fix_topic: fix_topic.into(),
        }
    }

    /// Bind `addr` and serve clients until a fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the TCP listener cannot be bound.
    pub async fn run(self, addr: SocketAddr) -> Result<(), BridgeError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BridgeError::Transport(format!("ws bind error on {addr}: {e}")))?;
        self.serve(listener).await
    }

    /// Serve clients on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), BridgeError> {
        if let Ok(local) = listener.local_addr() {
            info!(addr = %local, topic = %self.fix_topic, "ws gateway listening");
        }

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let gateway = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = gateway.handle_ws_client(stream, peer).await {
                            error!(peer = %peer, error = %e, "ws client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "ws accept error");
                }
            }
        }
    }

    async fn handle_ws_client(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), BridgeError> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| BridgeError::Transport(format!("ws handshake from {peer}: {e}")))?;
        debug!(peer = %peer, "ws client connected");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let mut rx = self.fix_bus.subscribe(&self.fix_topic);

        loop {
            tokio::select! {
                // Forward translated fixes to the client.
                result = rx.recv() => {
                    match result {
                        Ok(fix) => {
                            let json = fix_frame(&self.fix_topic, &fix)?;
                            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            warn!(peer = %peer, lagged_by = n, "ws client lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                // Handle incoming frames.
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(_)) => break,
                        Some(Ok(Message::Text(text))) => {
                            match self.ingest_frame(text.as_str()) {
                                Ok(Some(n)) => debug!(peer = %peer, receivers = n, "navsat frame ingested"),
                                Ok(None) => {}
                                Err(e) => warn!(peer = %peer, error = %e, "navsat frame dropped"),
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        debug!(peer = %peer, "ws client disconnected");
        Ok(())
    }

    /// Parse an incoming text frame and publish its NavSat payload on the
    /// simulation bus.
    ///
    /// Returns `Ok(None)` for frames that are not a `publish` op with a
    /// topic; those are ignored.  A `publish` frame whose `msg` is not a
    /// valid NavSat message yields [`BridgeError::Serialization`].
    pub fn ingest_frame(&self, text: &str) -> Result<Option<usize>, BridgeError> {
        let Ok(json) = serde_json::from_str::<serde_json::Value>(text) else {
            return Ok(None);
        };

        let op = json.get("op").and_then(|o| o.as_str()).unwrap_or("");
        let Some(topic) = json.get("topic").and_then(|t| t.as_str()) else {
            return Ok(None);
        };
        if op != "publish" {
            return Ok(None);
        }

        let body = json.get("msg").cloned().unwrap_or(serde_json::Value::Null);
        let msg: SimNavSat = serde_json::from_value(body)
            .map_err(|e| BridgeError::Serialization(format!("navsat frame on {topic}: {e}")))?;

        let envelope = SimEnvelope {
            msg,
            info: MessageInfo {
                topic: topic.to_string(),
                msg_type: SIM_NAVSAT_TYPE.to_string(),
                partition: String::new(),
                intra_process: false,
            },
        };
        self.sim_bus.publish(topic, envelope).map(Some)
    }
}

/// Serialise `fix` as a rosbridge `publish` frame on `topic`.
pub fn fix_frame(topic: &str, fix: &NavSatFix) -> Result<String, BridgeError> {
    serde_json::to_string(&PublishFrame {
        op: "publish",
        topic,
        msg: WireNavSatFix::from(fix),
    })
    .map_err(|e| BridgeError::Serialization(e.to_string()))
}
