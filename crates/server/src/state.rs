//! Shared state handed to every handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tunelink::Controller;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
	pub controller: Arc<Controller>,
	pub config: Arc<ServerConfig>,
	/// Shared client for public-IP lookups.
	pub http: reqwest::Client,
	started: Instant,
	ws_clients: Arc<AtomicUsize>,
}

impl AppState {
	pub fn new(controller: Arc<Controller>, config: Arc<ServerConfig>) -> Self {
		Self {
			controller,
			config,
			http: reqwest::Client::new(),
			started: Instant::now(),
			ws_clients: Arc::new(AtomicUsize::new(0)),
		}
	}

	pub fn uptime(&self) -> Duration {
		self.started.elapsed()
	}

	pub fn ws_client_count(&self) -> usize {
		self.ws_clients.load(Ordering::SeqCst)
	}

	pub fn ws_client_connected(&self) {
		self.ws_clients.fetch_add(1, Ordering::SeqCst);
	}

	pub fn ws_client_disconnected(&self) {
		self.ws_clients.fetch_sub(1, Ordering::SeqCst);
	}
}
