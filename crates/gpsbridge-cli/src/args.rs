//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "gps_bridge")]
#[command(about = "Relay simulator NavSat readings onto the robotics middleware")]
#[command(version)]
pub struct Args {
    /// Config file (defaults to ~/.gpsbridge/config.toml)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Simulated world name
    #[arg(long)]
    pub world_name: Option<String>,

    /// Vehicle model name
    #[arg(long)]
    pub name_space: Option<String>,

    /// Nested sensor model name
    #[arg(long)]
    pub sensor_name: Option<String>,

    /// Link carrying the sensor
    #[arg(long)]
    pub link_name: Option<String>,

    /// Sensor element name
    #[arg(long)]
    pub sensor_type: Option<String>,

    /// Publish topic, relative to the namespace
    #[arg(long, value_name = "TOPIC")]
    pub output_topic: Option<String>,

    /// WebSocket gateway listen address
    #[arg(long, value_name = "ADDR")]
    pub ws_addr: Option<String>,

    /// Do not start the WebSocket gateway
    #[arg(long)]
    pub no_gateway: bool,
}
