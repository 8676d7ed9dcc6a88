//! Command translation onto the player page.
//!
//! One `Controller` is shared by every HTTP handler and WebSocket task;
//! commands are self-contained and carry no caller affinity, so concurrent
//! executions may interleave at the endpoint and no queue is imposed on top
//! of the single-session invariant.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::cache::StatusCache;
use crate::command::{Command, CommandOutcome, clamp_percent, clamp_seek};
use crate::config::ControllerConfig;
use crate::executor::Executor;
use crate::script::{self, Selectors};
use crate::session::SessionLifecycle;
use crate::status::{PlayerStatus, TrackInfo, TrackTime, VolumeInfo, now_millis};
use crate::transport::Connector;

/// Ack every action script resolves to.
#[derive(Debug, Deserialize)]
struct ScriptAck {
	success: bool,
	#[serde(default)]
	action: Option<String>,
	#[serde(default)]
	message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeekBounds {
	max: f64,
}

/// Translates abstract commands into expression evaluations and typed
/// outcomes.
pub struct Controller {
	lifecycle: SessionLifecycle,
	executor: Executor,
	cache: StatusCache,
	selectors: Selectors,
}

impl Controller {
	pub fn new(config: ControllerConfig, connector: Arc<dyn Connector>) -> Self {
		Self::with_selectors(config, connector, Selectors::default())
	}

	pub fn with_selectors(config: ControllerConfig, connector: Arc<dyn Connector>, selectors: Selectors) -> Self {
		let cache = StatusCache::new(config.cache_duration);
		let lifecycle = SessionLifecycle::new(config, connector);
		let executor = Executor::new(lifecycle.clone());
		Self { lifecycle, executor, cache, selectors }
	}

	pub fn lifecycle(&self) -> &SessionLifecycle {
		&self.lifecycle
	}

	/// One connection attempt; used by the composition root at startup.
	pub async fn connect(&self) -> bool {
		self.lifecycle.connect().await
	}

	/// Executes one action command.
	pub async fn execute(&self, command: Command) -> CommandOutcome {
		match command {
			Command::PlaybackToggle => self.toggle_playback().await,
			Command::NextTrack => self.click(&self.selectors.next_button, "next button").await,
			Command::PreviousTrack => self.click(&self.selectors.prev_button, "previous button").await,
			Command::Like => self.click(&self.selectors.like_button, "like button").await,
			Command::Dislike => self.click(&self.selectors.dislike_button, "dislike button").await,
			Command::MuteToggle => self.click(&self.selectors.mute_button, "mute button").await,
			Command::SetVolume(percent) => self.set_volume(percent).await,
			Command::ChangeVolume(delta) => self.change_volume(delta).await,
			Command::Seek(seconds) => self.seek_to(seconds).await,
		}
	}

	/// Pause when a pause control is visible, otherwise play.
	pub async fn toggle_playback(&self) -> CommandOutcome {
		self.run_ack(script::toggle_playback(&self.selectors)).await
	}

	/// Absolute volume; the percent is clamped to `[0, 100]` before it is
	/// scaled to the slider's `[0, 1]` range.
	pub async fn set_volume(&self, percent: f64) -> CommandOutcome {
		let level = clamp_percent(percent) / 100.0;
		self.run_ack(script::set_slider(&self.selectors.volume_slider, "volume slider", level)).await
	}

	/// Relative volume; refuses to adjust blind when the current volume
	/// cannot be read.
	pub async fn change_volume(&self, delta: f64) -> CommandOutcome {
		let Some(volume) = self.get_volume().await else {
			return CommandOutcome::failed("current volume unavailable");
		};
		self.set_volume(volume.percentage + delta).await
	}

	/// Seeks to an absolute position, clamped to the track bounds read from
	/// the progress control at call time (never from cache).
	pub async fn seek_to(&self, seconds: f64) -> CommandOutcome {
		let Some(value) = self.executor.evaluate(script::read_seek_bounds(&self.selectors)).await else {
			return CommandOutcome { success: false, detail: None };
		};
		let bounds = match check_success(&value) {
			Ok(()) => match serde_json::from_value::<SeekBounds>(value) {
				Ok(bounds) => bounds,
				Err(err) => return CommandOutcome::failed(format!("malformed bounds payload: {err}")),
			},
			Err(detail) => return CommandOutcome::failed(detail),
		};

		let target = clamp_seek(seconds, bounds.max);
		self.run_ack(script::set_slider(&self.selectors.progress_slider, "progress slider", target)).await
	}

	/// Track metadata, served from cache inside the freshness window.
	pub async fn get_track_info(&self) -> Option<TrackInfo> {
		if let Some(hit) = self.cache.track_info(Instant::now()) {
			return Some(hit);
		}
		let value = self.executor.evaluate(script::read_track_info(&self.selectors)).await?;
		let info: TrackInfo = parse_query(value)?;
		self.cache.put_track_info(info.clone(), Instant::now());
		Some(info)
	}

	/// Playback position, served from cache inside the freshness window.
	pub async fn get_track_time(&self) -> Option<TrackTime> {
		if let Some(hit) = self.cache.track_time(Instant::now()) {
			return Some(hit);
		}
		let value = self.executor.evaluate(script::read_track_time(&self.selectors)).await?;
		let time: TrackTime = parse_query(value)?;
		self.cache.put_track_time(time.clone(), Instant::now());
		Some(time)
	}

	/// Volume state, served from cache inside the freshness window.
	pub async fn get_volume(&self) -> Option<VolumeInfo> {
		if let Some(hit) = self.cache.volume(Instant::now()) {
			return Some(hit);
		}
		let value = self.executor.evaluate(script::read_volume(&self.selectors)).await?;
		let volume: VolumeInfo = parse_query(value)?;
		self.cache.put_volume(volume.clone(), Instant::now());
		Some(volume)
	}

	/// Aggregate status: the three queries run concurrently; `connected`
	/// reflects session state when the call started, independent of whether
	/// the sub-queries succeed.
	pub async fn query_status(&self) -> PlayerStatus {
		let connected = self.lifecycle.is_connected();
		let (track, time, volume) =
			tokio::join!(self.get_track_info(), self.get_track_time(), self.get_volume());
		PlayerStatus { track, time, volume, connected, timestamp: now_millis() }
	}

	async fn click(&self, selector: &str, control: &str) -> CommandOutcome {
		self.run_ack(script::click(selector, control)).await
	}

	async fn run_ack(&self, expression: String) -> CommandOutcome {
		let Some(value) = self.executor.evaluate(expression).await else {
			return CommandOutcome { success: false, detail: None };
		};

		match serde_json::from_value::<ScriptAck>(value) {
			Ok(ScriptAck { success: true, action: Some(action), .. }) => CommandOutcome::ok_with(action),
			Ok(ScriptAck { success: true, .. }) => CommandOutcome::ok(),
			Ok(ScriptAck { success: false, message, .. }) => CommandOutcome {
				success: false,
				detail: message.or_else(|| Some("command failed".to_string())),
			},
			Err(err) => CommandOutcome::failed(format!("malformed command ack: {err}")),
		}
	}
}

fn check_success(value: &Value) -> Result<(), String> {
	if value.get("success").and_then(Value::as_bool) == Some(true) {
		return Ok(());
	}
	Err(value
		.get("message")
		.and_then(Value::as_str)
		.unwrap_or("command failed")
		.to_string())
}

fn parse_query<T: DeserializeOwned>(value: Value) -> Option<T> {
	if let Err(detail) = check_success(&value) {
		debug!(target = "tl.control", %detail, "query reported failure");
		return None;
	}
	match serde_json::from_value(value) {
		Ok(parsed) => Some(parsed),
		Err(err) => {
			debug!(target = "tl.control", error = %err, "malformed query payload");
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::transport::fake::FakeEndpoint;

	fn controller() -> (Controller, FakeEndpoint) {
		let (connector, endpoint) = FakeEndpoint::pair();
		let config = ControllerConfig { auto_connect: false, ..ControllerConfig::default() };
		(Controller::new(config, connector), endpoint)
	}

	fn ack_ok() -> Value {
		json!({ "success": true })
	}

	fn volume_payload(percentage: f64) -> Value {
		json!({ "success": true, "volume": percentage / 100.0, "percentage": percentage, "isMuted": false })
	}

	#[tokio::test]
	async fn toggle_reports_the_action_taken() {
		let (controller, endpoint) = controller();
		endpoint.enqueue_value(json!({ "success": true, "action": "pause" }));

		let outcome = controller.execute(Command::PlaybackToggle).await;
		assert!(outcome.success);
		assert_eq!(outcome.detail.as_deref(), Some("pause"));
	}

	#[tokio::test]
	async fn toggle_without_controls_fails_with_detail() {
		let (controller, endpoint) = controller();
		endpoint.enqueue_value(json!({ "success": false, "message": "playback controls not found" }));

		let outcome = controller.execute(Command::PlaybackToggle).await;
		assert!(!outcome.success);
		assert!(!outcome.detail.unwrap().is_empty());
	}

	#[tokio::test]
	async fn set_volume_clamps_to_the_slider_range() {
		let (controller, endpoint) = controller();
		endpoint.enqueue_value(ack_ok());
		endpoint.enqueue_value(ack_ok());

		assert!(controller.set_volume(150.0).await.success);
		assert!(controller.set_volume(-20.0).await.success);

		let scripts = endpoint.evaluated();
		assert!(scripts[0].ends_with("})(1.0)"), "over-range percent should clamp to 1.0: {}", scripts[0]);
		assert!(scripts[1].ends_with("})(0.0)"), "under-range percent should clamp to 0.0: {}", scripts[1]);
	}

	#[tokio::test]
	async fn change_volume_requires_a_readable_current_volume() {
		let (controller, endpoint) = controller();
		endpoint.enqueue_value(json!({ "success": false, "message": "volume slider not found" }));

		let outcome = controller.change_volume(10.0).await;
		assert!(!outcome.success);
		assert_eq!(outcome.detail.as_deref(), Some("current volume unavailable"));
		// Only the volume query ran; no set was attempted.
		assert_eq!(endpoint.evaluated().len(), 1);
	}

	#[tokio::test]
	async fn change_volume_applies_a_clamped_delta() {
		let (controller, endpoint) = controller();
		endpoint.enqueue_value(volume_payload(95.0));
		endpoint.enqueue_value(ack_ok());

		assert!(controller.change_volume(10.0).await.success);
		let scripts = endpoint.evaluated();
		assert!(scripts[1].ends_with("})(1.0)"), "95 + 10 should clamp to full volume: {}", scripts[1]);
	}

	#[tokio::test]
	async fn seek_reads_bounds_at_call_time_and_clamps() {
		let (controller, endpoint) = controller();
		endpoint.enqueue_value(json!({ "success": true, "max": 200.0 }));
		endpoint.enqueue_value(ack_ok());

		assert!(controller.seek_to(500.0).await.success);
		let scripts = endpoint.evaluated();
		assert!(scripts[0].contains("slider.max"), "first evaluation reads the bounds");
		assert!(scripts[1].ends_with("})(200.0)"), "target should clamp to the bound: {}", scripts[1]);
	}

	#[tokio::test]
	async fn seek_below_zero_clamps_to_zero() {
		let (controller, endpoint) = controller();
		endpoint.enqueue_value(json!({ "success": true, "max": 200.0 }));
		endpoint.enqueue_value(ack_ok());

		assert!(controller.seek_to(-5.0).await.success);
		assert!(endpoint.evaluated()[1].ends_with("})(0.0)"));
	}

	#[tokio::test]
	async fn seek_fails_when_bounds_are_unreadable() {
		let (controller, endpoint) = controller();
		endpoint.enqueue_value(json!({ "success": false, "message": "progress slider not found" }));

		let outcome = controller.seek_to(30.0).await;
		assert!(!outcome.success);
		assert_eq!(outcome.detail.as_deref(), Some("progress slider not found"));
		assert_eq!(endpoint.evaluated().len(), 1);
	}

	#[tokio::test]
	async fn queries_hit_the_cache_inside_the_window() {
		let (controller, endpoint) = controller();
		endpoint.enqueue_value(json!({ "success": true, "title": "Song", "artist": "Band", "coverUrl": null }));

		let first = controller.get_track_info().await.unwrap();
		let second = controller.get_track_info().await.unwrap();
		assert_eq!(first, second);
		assert_eq!(endpoint.evaluated().len(), 1, "second read should not evaluate");
	}

	#[tokio::test]
	async fn failed_queries_are_not_cached() {
		let (controller, endpoint) = controller();
		endpoint.enqueue_value(json!({ "success": false, "message": "track metadata not found" }));
		endpoint.enqueue_value(json!({ "success": true, "title": "Song", "artist": "Band", "coverUrl": null }));

		assert!(controller.get_track_info().await.is_none());
		assert!(controller.get_track_info().await.is_some());
		assert_eq!(endpoint.evaluated().len(), 2);
	}

	#[tokio::test]
	async fn status_with_endpoint_down_never_panics() {
		let (connector, endpoint) = FakeEndpoint::pair();
		endpoint.refuse_connections(true);
		let config = ControllerConfig { auto_connect: false, ..ControllerConfig::default() };
		let controller = Controller::new(config, connector);

		assert!(!controller.connect().await);
		let status = controller.query_status().await;
		assert!(!status.connected);
		assert!(status.track.is_none());
		assert!(status.time.is_none());
		assert!(status.volume.is_none());
		assert!(status.timestamp > 0);
	}

	#[tokio::test]
	async fn status_reports_connectivity_at_call_time() {
		let (controller, endpoint) = controller();
		assert!(controller.connect().await);
		endpoint.enqueue_value(json!({ "success": true, "title": "Song", "artist": "Band", "coverUrl": null }));

		let status = controller.query_status().await;
		assert!(status.connected);
		assert!(status.track.is_some());
	}

	#[tokio::test]
	async fn mute_toggle_reports_missing_control() {
		let (controller, endpoint) = controller();
		endpoint.enqueue_value(json!({ "success": false, "message": "mute button not found" }));

		let outcome = controller.execute(Command::MuteToggle).await;
		assert!(!outcome.success);
		assert_eq!(outcome.detail.as_deref(), Some("mute button not found"));
	}
}
