//! Command-line surface of `tunelinkd`.

use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use tunelink::ControllerConfig;

use crate::config::ServerConfig;

#[derive(Debug, Parser)]
#[command(name = "tunelinkd", version, about = "Remote-control server for a desktop media player")]
pub struct Cli {
	/// Address to bind the HTTP/WebSocket listener to.
	#[arg(long, default_value = "0.0.0.0", env = "TUNELINK_BIND")]
	pub bind: IpAddr,

	/// HTTP listen port; the WebSocket endpoint lives at /ws on the same port.
	#[arg(long, default_value_t = 3002, env = "TUNELINK_HTTP_PORT")]
	pub http_port: u16,

	/// Access token required by /status, /control, and /ws.
	#[arg(long, default_value = "remote-token", env = "TUNELINK_TOKEN")]
	pub token: String,

	/// Host of the player's debug endpoint.
	#[arg(long, default_value = "localhost", env = "TUNELINK_ENDPOINT_HOST")]
	pub endpoint_host: String,

	/// Port of the player's debug endpoint.
	#[arg(long, default_value_t = 9222, env = "TUNELINK_ENDPOINT_PORT")]
	pub endpoint_port: u16,

	/// Skip the connection attempt at startup and disable automatic
	/// reconnects; the endpoint is only dialed when a command needs it.
	#[arg(long)]
	pub no_auto_connect: bool,

	/// Seconds between watchdog checks that revive a dead connection;
	/// 0 disables the watchdog.
	#[arg(long, default_value_t = 300, env = "TUNELINK_WATCHDOG_SECS")]
	pub watchdog_secs: u64,

	/// Increase log verbosity (-v: debug, -vv: trace).
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}

impl Cli {
	pub fn into_config(self) -> ServerConfig {
		ServerConfig {
			bind: self.bind,
			http_port: self.http_port,
			auth_token: self.token,
			watchdog_interval: Duration::from_secs(self.watchdog_secs),
			controller: ControllerConfig {
				endpoint_host: self.endpoint_host,
				endpoint_port: self.endpoint_port,
				auto_connect: !self.no_auto_connect,
				..ControllerConfig::default()
			},
		}
	}
}
