//! Transport seams of the bridge.
//!
//! The bridge never talks to a concrete transport.  It subscribes through a
//! [`SimTransport`] and hands translated fixes to a [`FixPublisher`], so the
//! translation path can be exercised without a live simulator or middleware.
//!
//! [`TopicBus`] implements both: `TopicBus<SimEnvelope>` as the simulator
//! side, `TopicBus<NavSatFix>` as the middleware side.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use gpsbridge_types::{BridgeError, MessageInfo, NavSatFix, SimNavSat};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::bus::{SimEnvelope, TopicBus};

/// Source of simulator NavSat messages.
#[async_trait]
pub trait SimTransport: Send + Sync {
    /// Subscribe to `topic` and return the stream of `(message, metadata)`
    /// pairs delivered on it.  The stream ends when the transport shuts down.
    async fn subscribe(&self, topic: &str) -> BoxStream<'static, (SimNavSat, MessageInfo)>;
}

/// Sink for translated fixes.
pub trait FixPublisher: Send + Sync {
    /// Publish `fix` on `topic`, returning the number of receivers reached.
    fn publish_fix(&self, topic: &str, fix: NavSatFix) -> Result<usize, BridgeError>;
}

#[async_trait]
impl SimTransport for TopicBus<SimEnvelope> {
    async fn subscribe(&self, topic: &str) -> BoxStream<'static, (SimNavSat, MessageInfo)> {
        let receiver = TopicBus::subscribe(self, topic);
        Box::pin(stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(SimEnvelope { msg, info }) => return Some(((msg, info), receiver)),
                    Err(RecvError::Lagged(n)) => {
                        // Subscriber fell behind; log and continue.
                        warn!(topic = %receiver.topic(), lagged_by = n, "navsat subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }))
    }
}

impl FixPublisher for TopicBus<NavSatFix> {
    fn publish_fix(&self, topic: &str, fix: NavSatFix) -> Result<usize, BridgeError> {
        self.publish(topic, fix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use gpsbridge_types::{CovarianceType, FixStatus, Header, NavSatStatus};

    fn envelope(topic: &str, lat: f64) -> SimEnvelope {
        SimEnvelope {
            msg: SimNavSat {
                latitude_deg: lat,
                ..Default::default()
            },
            info: MessageInfo {
                topic: topic.to_string(),
                msg_type: "ignition.msgs.NavSat".to_string(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn sim_stream_yields_published_pairs() -> Result<(), Box<dyn std::error::Error>> {
        let bus: TopicBus<SimEnvelope> = TopicBus::default();
        let mut stream = SimTransport::subscribe(&bus, "world/w/navsat").await;

        bus.publish("world/w/navsat", envelope("world/w/navsat", 1.5))?;

        let (msg, info) = stream.next().await.ok_or("stream ended")?;
        assert_eq!(msg.latitude_deg, 1.5);
        assert_eq!(info.topic, "world/w/navsat");
        Ok(())
    }

    #[tokio::test]
    async fn sim_stream_skips_lag_and_continues() -> Result<(), Box<dyn std::error::Error>> {
        let bus: TopicBus<SimEnvelope> = TopicBus::new(4);
        let mut stream = SimTransport::subscribe(&bus, "t").await;

        for i in 0..20_i32 {
            bus.publish("t", envelope("t", f64::from(i)))?;
        }

        // The oldest messages were dropped; the newest remain.
        let (msg, _) = stream.next().await.ok_or("stream ended")?;
        assert_eq!(msg.latitude_deg, 16.0);
        Ok(())
    }

    #[tokio::test]
    async fn sim_stream_ends_when_bus_dropped() {
        let bus: TopicBus<SimEnvelope> = TopicBus::default();
        let mut stream = SimTransport::subscribe(&bus, "t").await;
        drop(bus);
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn fix_publisher_routes_to_topic() -> Result<(), Box<dyn std::error::Error>> {
        let bus: TopicBus<NavSatFix> = TopicBus::default();
        let mut rx = bus.subscribe("/drone1/sensor_measurements/gps");

        let fix = NavSatFix {
            header: Header::default(),
            status: NavSatStatus { status: FixStatus::Fix, service: 0 },
            latitude: 1.0,
            longitude: 2.0,
            altitude: 3.0,
            position_covariance: [0.0; 9],
            position_covariance_type: CovarianceType::Unknown,
        };
        assert_eq!(bus.publish_fix("/drone1/sensor_measurements/gps", fix.clone())?, 1);
        assert_eq!(rx.try_recv()?, fix);
        Ok(())
    }
}
