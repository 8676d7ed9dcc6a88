//! End-to-end flows over the in-memory endpoint: cold start against a dead
//! endpoint, recovery after a disconnect, and command traffic in between.

use std::time::Duration;

use serde_json::json;
use tunelink::transport::fake::FakeEndpoint;
use tunelink::{Command, ConnectionState, Controller, ControllerConfig};

fn fast_config() -> ControllerConfig {
	ControllerConfig {
		reconnect_base_delay: Duration::from_millis(2),
		max_reconnect_attempts: 3,
		..ControllerConfig::default()
	}
}

async fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
	let deadline = tokio::time::Instant::now() + timeout;
	while tokio::time::Instant::now() < deadline {
		if condition() {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	condition()
}

#[tokio::test]
async fn cold_start_against_a_dead_endpoint_degrades_gracefully() {
	let (connector, endpoint) = FakeEndpoint::pair();
	endpoint.refuse_connections(true);
	let config = ControllerConfig { auto_connect: false, ..fast_config() };
	let controller = Controller::new(config, connector);

	// Startup connect fails and the lifecycle rests in Disconnected.
	assert!(!controller.connect().await);
	assert_eq!(controller.lifecycle().state(), ConnectionState::Disconnected);

	// A status poll finds no session, reports disconnected, and never panics.
	let status = controller.query_status().await;
	assert!(!status.connected);
	assert!(status.track.is_none() && status.time.is_none() && status.volume.is_none());

	// Commands degrade to plain failures.
	let outcome = controller.execute(Command::NextTrack).await;
	assert!(!outcome.success);
}

#[tokio::test]
async fn endpoint_coming_back_revives_command_traffic() {
	let (connector, endpoint) = FakeEndpoint::pair();
	endpoint.refuse_connections(true);
	let controller = Controller::new(fast_config(), connector);

	assert!(!controller.connect().await);
	let lifecycle = controller.lifecycle().clone();
	assert!(wait_until(|| lifecycle.reconnect_exhausted(), Duration::from_secs(2)).await);

	// The player comes up; the next session request (the external trigger)
	// reconnects and the budget is restored.
	endpoint.refuse_connections(false);
	assert!(controller.lifecycle().session().await.is_some());
	let status = controller.query_status().await;
	assert!(status.connected);
	assert!(!controller.lifecycle().reconnect_exhausted());
	assert_eq!(controller.lifecycle().status().attempts, 0);

	endpoint.enqueue_value(json!({ "success": true, "action": "play" }));
	let outcome = controller.execute(Command::PlaybackToggle).await;
	assert!(outcome.success);
	assert_eq!(outcome.detail.as_deref(), Some("play"));
}

#[tokio::test]
async fn disconnect_mid_session_reconnects_without_caller_involvement() {
	let (connector, endpoint) = FakeEndpoint::pair();
	let controller = Controller::new(fast_config(), connector);

	assert!(controller.connect().await);
	let before = endpoint.connect_attempts();

	endpoint.trip_disconnect();
	let lifecycle = controller.lifecycle().clone();
	assert!(
		wait_until(
			|| lifecycle.is_connected() && endpoint.connect_attempts() > before,
			Duration::from_secs(2)
		)
		.await,
		"lifecycle should have dialed again on its own"
	);

	endpoint.enqueue_value(json!({ "success": true }));
	assert!(controller.execute(Command::Like).await.success);
}
