//! Composition root: wires the controller to the HTTP/WebSocket surface and
//! runs the server until ctrl-c.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tunelink::Controller;
use tunelink::transport::cdp::CdpConnector;

use crate::config::ServerConfig;
use crate::state::AppState;
use crate::{http, net};

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
	let controller = Arc::new(Controller::new(config.controller.clone(), Arc::new(CdpConnector::new())));
	let state = AppState::new(Arc::clone(&controller), Arc::new(config));

	let addr = state.config.listen_addr();
	let listener = tokio::net::TcpListener::bind(addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;

	announce(&state);

	if state.config.controller.auto_connect {
		// Failures are logged by the lifecycle, which keeps retrying on its
		// own; the server comes up either way.
		controller.connect().await;
	}

	spawn_watchdog(state.clone());

	axum::serve(listener, http::router(state).into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(shutdown_signal(controller))
		.await
		.context("server error")?;

	Ok(())
}

fn announce(state: &AppState) {
	let config = &state.config;
	info!(target = "tl", addr = %config.listen_addr(), "http listener bound");

	let network = net::network_info(config.http_port);
	if let (Some(http_url), Some(ws_url)) = (&network.http_url, &network.ws_url) {
		info!(target = "tl", %http_url, %ws_url, "lan addresses");
	}

	info!(
		target = "tl",
		host = %config.controller.endpoint_host,
		port = config.controller.endpoint_port,
		"automation endpoint"
	);
	info!(
		target = "tl",
		example = %format!("/status?token={}", config.auth_token),
		"access token required"
	);
}

/// Periodically nudges a dead connection back to life. This is the external
/// trigger that revives a lifecycle whose reconnect budget ran out.
fn spawn_watchdog(state: AppState) {
	let interval = state.config.watchdog_interval;
	if interval.is_zero() {
		return;
	}

	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		// The first tick fires immediately; startup already connected.
		ticker.tick().await;

		loop {
			ticker.tick().await;
			let lifecycle = state.controller.lifecycle();
			if lifecycle.is_connected() {
				continue;
			}
			if lifecycle.reconnect_exhausted() {
				warn!(target = "tl.session", "watchdog reviving an exhausted reconnect loop");
			}
			lifecycle.session().await;
		}
	});
}

async fn shutdown_signal(controller: Arc<Controller>) {
	if tokio::signal::ctrl_c().await.is_err() {
		warn!(target = "tl", "failed to listen for ctrl-c; running until killed");
		std::future::pending::<()>().await;
	}
	info!(target = "tl", "shutting down");
	controller.lifecycle().shutdown();
}
