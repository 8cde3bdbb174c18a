//! Simulator-to-middleware GPS bridge.
//!
//! [`GpsBridge`] owns everything one bridge instance needs for its lifetime:
//!
//! 1. The read-only [`BridgeConfig`] and the subscription topic resolved from
//!    it once, at construction.
//! 2. A [`SimTransport`] to subscribe on and a [`FixPublisher`] to hand
//!    translated fixes to.
//!
//! The per-message work lives in the closure returned by
//! [`GpsBridge::callback`], which captures the configuration and publisher
//! rather than reading any process-wide state, so it can be driven directly
//! from tests.

use std::sync::Arc;

use futures_util::StreamExt;
use gpsbridge_types::{BridgeConfig, BridgeError, MessageInfo, NavSatFix, SimNavSat};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::adapter::{FixPublisher, SimTransport};
use crate::topic::{resolve, ResolvedTopic};
use crate::translate::translate;

/// Default publish topic, relative to the vehicle namespace.
pub const DEFAULT_OUTPUT_TOPIC: &str = "sensor_measurements/gps";

/// One NavSat sensor bridged from the simulator into the middleware.
pub struct GpsBridge {
    config: Arc<BridgeConfig>,
    topic: ResolvedTopic,
    output_topic: String,
    transport: Arc<dyn SimTransport>,
    publisher: Arc<dyn FixPublisher>,
}

impl GpsBridge {
    /// Create a bridge for the sensor described by `config`.
    pub fn new(
        config: Arc<BridgeConfig>,
        transport: Arc<dyn SimTransport>,
        publisher: Arc<dyn FixPublisher>,
    ) -> Self {
        let topic = resolve(&config);
        let output_topic = namespaced(&config.name_space, DEFAULT_OUTPUT_TOPIC);
        Self {
            config,
            topic,
            output_topic,
            transport,
            publisher,
        }
    }

    /// Publish under `/<name_space>/<relative>` instead of the default
    /// [`DEFAULT_OUTPUT_TOPIC`].
    pub fn with_output_topic(mut self, relative: &str) -> Self {
        self.output_topic = namespaced(&self.config.name_space, relative);
        self
    }

    /// The simulator topic this bridge subscribes to.
    pub fn topic(&self) -> &ResolvedTopic {
        &self.topic
    }

    /// The middleware topic translated fixes are published on.
    pub fn output_topic(&self) -> &str {
        &self.output_topic
    }

    /// Build the per-message callback: translate, publish, return the fix.
    ///
    /// Publishing while nobody listens is normal and only traced; other
    /// publish errors are logged.  Neither affects the returned fix.
    pub fn callback(&self) -> impl Fn(&SimNavSat, &MessageInfo) -> NavSatFix + Send + Sync + use<> {
        let config = Arc::clone(&self.config);
        let publisher = Arc::clone(&self.publisher);
        let output_topic = self.output_topic.clone();

        move |msg, info| {
            let fix = translate(msg, info);
            debug!(
                sensor = %config.sensor_name,
                frame_id = %fix.header.frame_id,
                stamp = ?fix.header.stamp.as_datetime(),
                latitude = fix.latitude,
                longitude = fix.longitude,
                altitude = fix.altitude,
                "navsat fix translated"
            );

            match publisher.publish_fix(&output_topic, fix.clone()) {
                Ok(receivers) => trace!(topic = %output_topic, receivers, "navsat fix published"),
                Err(BridgeError::NoSubscribers(topic)) => {
                    trace!(topic = %topic, "navsat fix published with no subscribers");
                }
                Err(e) => warn!(topic = %output_topic, error = %e, "navsat fix publish failed"),
            }
            fix
        }
    }

    /// Subscribe and bridge messages until `shutdown` turns `true`, its
    /// sender is dropped, or the simulator stream ends.
    ///
    /// Messages are handled one at a time in delivery order.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }

        let callback = self.callback();
        let mut stream = self.transport.subscribe(self.topic.as_str()).await;
        info!(
            subscribe = %self.topic,
            publish = %self.output_topic,
            "gps bridge running"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                next = stream.next() => {
                    match next {
                        Some((msg, info)) => {
                            callback(&msg, &info);
                        }
                        None => {
                            warn!(topic = %self.topic, "simulator stream closed");
                            break;
                        }
                    }
                }
            }
        }

        info!(topic = %self.topic, "gps bridge stopped");
    }
}

/// Join a relative topic under the namespace: `/<ns>/<relative>`.
fn namespaced(name_space: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    if name_space.is_empty() {
        format!("/{relative}")
    } else {
        format!("/{}/{relative}", name_space.trim_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{SimEnvelope, TopicBus};
    use gpsbridge_types::{CovarianceType, FixStatus, SimHeader, SimTime};
    use std::time::Duration;

    const SIM_TOPIC: &str =
        "world/default/model/drone1/model/gps0/link/base_link/sensor/navsat_sensor/navsat";

    fn config() -> Arc<BridgeConfig> {
        Arc::new(BridgeConfig {
            world_name: "default".to_string(),
            name_space: "drone1".to_string(),
            sensor_name: "gps0".to_string(),
            link_name: "base_link".to_string(),
            sensor_type: "navsat_sensor".to_string(),
        })
    }

    fn make_bridge() -> (TopicBus<SimEnvelope>, TopicBus<NavSatFix>, GpsBridge) {
        let sim = TopicBus::<SimEnvelope>::default();
        let ros = TopicBus::<NavSatFix>::default();
        let bridge = GpsBridge::new(config(), Arc::new(sim.clone()), Arc::new(ros.clone()));
        (sim, ros, bridge)
    }

    fn envelope(frame_id: &str, lat: f64, lon: f64, alt: f64) -> SimEnvelope {
        SimEnvelope {
            msg: SimNavSat {
                header: SimHeader {
                    stamp: SimTime { sec: 100, nsec: 250 },
                    data: vec![],
                },
                frame_id: frame_id.to_string(),
                latitude_deg: lat,
                longitude_deg: lon,
                altitude: alt,
                ..Default::default()
            },
            info: MessageInfo {
                topic: SIM_TOPIC.to_string(),
                msg_type: "ignition.msgs.NavSat".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn resolves_topics_at_construction() {
        let (_, _, bridge) = make_bridge();
        assert_eq!(bridge.topic().as_str(), SIM_TOPIC);
        assert_eq!(bridge.output_topic(), "/drone1/sensor_measurements/gps");
    }

    #[test]
    fn output_topic_override() {
        let (_, _, bridge) = make_bridge();
        let bridge = bridge.with_output_topic("/gps/fix");
        assert_eq!(bridge.output_topic(), "/drone1/gps/fix");
    }

    #[test]
    fn namespaced_handles_empty_and_slashed_namespaces() {
        assert_eq!(namespaced("", "sensor_measurements/gps"), "/sensor_measurements/gps");
        assert_eq!(namespaced("/uav/", "gps"), "/uav/gps");
    }

    #[test]
    fn callback_translates_and_publishes() -> Result<(), Box<dyn std::error::Error>> {
        let (_, ros, bridge) = make_bridge();
        let mut rx = ros.subscribe(bridge.output_topic());
        let callback = bridge.callback();

        let env = envelope("drone1::base_link::gps0", 12.34, -56.78, 100.5);
        let fix = callback(&env.msg, &env.info);

        assert_eq!(fix.header.frame_id, "drone1/base_link/gps0");
        assert_eq!(fix.latitude, 12.34);
        assert_eq!(fix.longitude, -56.78);
        assert_eq!(fix.altitude, 100.5);
        assert_eq!(fix.position_covariance_type, CovarianceType::Unknown);
        assert_eq!(fix.status.status, FixStatus::Fix);
        assert_eq!(rx.try_recv()?, fix);
        Ok(())
    }

    #[test]
    fn callback_without_subscribers_still_returns_fix() {
        let (_, _, bridge) = make_bridge();
        let callback = bridge.callback();
        let env = envelope("gps0", 1.0, 2.0, 3.0);
        let fix = callback(&env.msg, &env.info);
        assert_eq!(fix.header.frame_id, "gps0");
    }

    #[test]
    fn callback_is_shareable_across_threads() {
        let (_, ros, bridge) = make_bridge();
        let _rx = ros.subscribe(bridge.output_topic());
        let callback = Arc::new(bridge.callback());

        let handles: Vec<_> = (0..4_i32)
            .map(|i| {
                let callback = Arc::clone(&callback);
                std::thread::spawn(move || {
                    let env = envelope("a::b", f64::from(i), 0.0, 0.0);
                    callback(&env.msg, &env.info).latitude
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().expect("thread panicked"), i as f64);
        }
    }

    #[tokio::test]
    async fn run_bridges_messages_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let (sim, ros, bridge) = make_bridge();
        let mut rx = ros.subscribe(bridge.output_topic());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(bridge.run(shutdown_rx));

        // Wait until the bridge has subscribed.
        while sim.subscriber_count(SIM_TOPIC) == 0 {
            tokio::task::yield_now().await;
        }

        sim.publish(SIM_TOPIC, envelope("drone1::gps0", 1.0, 10.0, 100.0))?;
        sim.publish(SIM_TOPIC, envelope("drone1::gps0", 2.0, 20.0, 200.0))?;

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await??;
        let second = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await??;
        assert_eq!(first.latitude, 1.0);
        assert_eq!(second.latitude, 2.0);
        assert_eq!(first.header.frame_id, "drone1/gps0");
        assert_eq!(first.header.stamp.sec, 100);
        assert_eq!(first.header.stamp.nanosec, 250);

        shutdown_tx.send(true)?;
        tokio::time::timeout(Duration::from_secs(1), task).await??;
        Ok(())
    }

    #[tokio::test]
    async fn run_ignores_other_topics() -> Result<(), Box<dyn std::error::Error>> {
        let (sim, ros, bridge) = make_bridge();
        let mut rx = ros.subscribe(bridge.output_topic());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(bridge.run(shutdown_rx));

        while sim.subscriber_count(SIM_TOPIC) == 0 {
            tokio::task::yield_now().await;
        }
        let _other = sim.subscribe("world/default/model/drone2/navsat");
        sim.publish("world/default/model/drone2/navsat", envelope("drone2::gps0", 9.0, 9.0, 9.0))?;

        let result = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(result.is_err(), "fix from another sensor must not be bridged");

        shutdown_tx.send(true)?;
        task.await?;
        Ok(())
    }

    #[tokio::test]
    async fn run_stops_when_shutdown_sender_dropped() -> Result<(), Box<dyn std::error::Error>> {
        let (_sim, _ros, bridge) = make_bridge();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(bridge.run(shutdown_rx));
        drop(shutdown_tx);
        tokio::time::timeout(Duration::from_secs(1), task).await??;
        Ok(())
    }

    #[tokio::test]
    async fn run_returns_immediately_if_already_shut_down() -> Result<(), Box<dyn std::error::Error>> {
        let (_sim, _ros, bridge) = make_bridge();
        let (_shutdown_tx, shutdown_rx) = watch::channel(true);
        tokio::time::timeout(Duration::from_secs(1), bridge.run(shutdown_rx)).await?;
        Ok(())
    }
}
