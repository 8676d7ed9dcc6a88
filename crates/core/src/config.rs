//! Controller configuration.

use std::time::Duration;

/// Tunables for the session stack.
///
/// Defaults match the stock desktop player setup: debug endpoint on
/// `localhost:9222`, a 2 s query cache, and up to ten linearly backed-off
/// reconnect attempts 3 s apart.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
	/// Host of the player's debug endpoint.
	pub endpoint_host: String,
	/// Port of the player's debug endpoint.
	pub endpoint_port: u16,
	/// How long a cached query result stays fresh.
	pub cache_duration: Duration,
	/// Base delay between reconnect attempts; attempt `n` waits `n * base`.
	pub reconnect_base_delay: Duration,
	/// Reconnect attempts before the loop parks itself.
	pub max_reconnect_attempts: u32,
	/// Schedule reconnects automatically after failures and disconnects.
	pub auto_connect: bool,
}

impl Default for ControllerConfig {
	fn default() -> Self {
		Self {
			endpoint_host: "localhost".to_string(),
			endpoint_port: 9222,
			cache_duration: Duration::from_millis(2000),
			reconnect_base_delay: Duration::from_millis(3000),
			max_reconnect_attempts: 10,
			auto_connect: true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_stock_player_setup() {
		let config = ControllerConfig::default();
		assert_eq!(config.endpoint_host, "localhost");
		assert_eq!(config.endpoint_port, 9222);
		assert_eq!(config.cache_duration, Duration::from_millis(2000));
		assert_eq!(config.reconnect_base_delay, Duration::from_millis(3000));
		assert_eq!(config.max_reconnect_attempts, 10);
		assert!(config.auto_connect);
	}
}
