//! Resolved server configuration.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tunelink::ControllerConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub bind: IpAddr,
	pub http_port: u16,
	pub auth_token: String,
	/// Zero disables the watchdog.
	pub watchdog_interval: Duration,
	pub controller: ControllerConfig,
}

impl ServerConfig {
	pub fn listen_addr(&self) -> SocketAddr {
		SocketAddr::new(self.bind, self.http_port)
	}
}
