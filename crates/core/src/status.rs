//! Typed snapshots returned by player queries.
//!
//! Field names serialize in camelCase because the values are read straight
//! out of the player page and handed back to HTTP/WebSocket clients in the
//! same shape.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Currently playing track metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
	pub title: String,
	pub artist: String,
	#[serde(default)]
	pub cover_url: Option<String>,
}

/// Playback position as the player bar presents it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackTime {
	/// Elapsed time label, e.g. `1:23`.
	pub current_time: String,
	/// Total time label, e.g. `3:45`.
	pub total_time: String,
	/// Progress slider position in seconds.
	pub progress: f64,
	/// Progress slider upper bound in seconds.
	pub max: f64,
	/// Position as a percentage of the upper bound.
	pub percent: f64,
}

/// Volume control state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
	/// Raw slider value in `[0, 1]`.
	pub volume: f64,
	/// Slider value scaled to `[0, 100]`.
	pub percentage: f64,
	pub is_muted: bool,
}

/// Aggregate status assembled by `get-status`.
///
/// `connected` reflects session state at call time; each sub-field is `None`
/// when its query failed or no session was available.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatus {
	pub track: Option<TrackInfo>,
	pub time: Option<TrackTime>,
	pub volume: Option<VolumeInfo>,
	pub connected: bool,
	pub timestamp: u64,
}

/// Milliseconds since the unix epoch.
pub fn now_millis() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_millis() as u64)
		.unwrap_or(0)
}
