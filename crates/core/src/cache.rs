//! Time-boxed memoization of read-mostly player queries.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::status::{TrackInfo, TrackTime, VolumeInfo};

/// Cache for the three status queries a polling client hammers: track info,
/// playback position, and volume.
///
/// All three slots share one freshness stamp: storing into any slot restamps
/// the staleness check for the other two, so a hit can return a value older
/// than the stamp suggests. Freshness is evaluated per read; nothing expires
/// proactively. Callers pass `now` so tests can replay exact timings.
pub struct StatusCache {
	ttl: Duration,
	inner: Mutex<Slots>,
}

#[derive(Default)]
struct Slots {
	track: Option<TrackInfo>,
	time: Option<TrackTime>,
	volume: Option<VolumeInfo>,
	last_update: Option<Instant>,
}

impl StatusCache {
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, inner: Mutex::new(Slots::default()) }
	}

	fn fresh(&self, slots: &Slots, now: Instant) -> bool {
		slots
			.last_update
			.is_some_and(|stamp| now.saturating_duration_since(stamp) < self.ttl)
	}

	pub fn track_info(&self, now: Instant) -> Option<TrackInfo> {
		let slots = self.inner.lock();
		if self.fresh(&slots, now) { slots.track.clone() } else { None }
	}

	pub fn put_track_info(&self, value: TrackInfo, now: Instant) {
		let mut slots = self.inner.lock();
		slots.track = Some(value);
		slots.last_update = Some(now);
	}

	pub fn track_time(&self, now: Instant) -> Option<TrackTime> {
		let slots = self.inner.lock();
		if self.fresh(&slots, now) { slots.time.clone() } else { None }
	}

	pub fn put_track_time(&self, value: TrackTime, now: Instant) {
		let mut slots = self.inner.lock();
		slots.time = Some(value);
		slots.last_update = Some(now);
	}

	pub fn volume(&self, now: Instant) -> Option<VolumeInfo> {
		let slots = self.inner.lock();
		if self.fresh(&slots, now) { slots.volume.clone() } else { None }
	}

	pub fn put_volume(&self, value: VolumeInfo, now: Instant) {
		let mut slots = self.inner.lock();
		slots.volume = Some(value);
		slots.last_update = Some(now);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ttl() -> Duration {
		Duration::from_millis(2000)
	}

	fn track(title: &str) -> TrackInfo {
		TrackInfo { title: title.to_string(), artist: "Band".to_string(), cover_url: None }
	}

	fn volume(percentage: f64) -> VolumeInfo {
		VolumeInfo { volume: percentage / 100.0, percentage, is_muted: false }
	}

	#[test]
	fn hit_inside_window_miss_after() {
		let cache = StatusCache::new(ttl());
		let t0 = Instant::now();

		cache.put_track_info(track("a"), t0);
		assert_eq!(cache.track_info(t0 + Duration::from_millis(1900)), Some(track("a")));
		assert_eq!(cache.track_info(t0 + Duration::from_millis(2100)), None);
	}

	#[test]
	fn empty_cache_misses() {
		let cache = StatusCache::new(ttl());
		assert_eq!(cache.volume(Instant::now()), None);
	}

	// The shared stamp means a fresh fetch of one kind extends the read
	// window for the others' existing values. Pinned here so a change to
	// that behavior is a conscious one.
	#[test]
	fn refreshing_one_slot_extends_the_others_window() {
		let cache = StatusCache::new(ttl());
		let t0 = Instant::now();

		cache.put_volume(volume(40.0), t0);
		cache.put_track_info(track("b"), t0 + Duration::from_millis(1500));

		// 3 s after the volume was captured it is stale on its own terms,
		// but the track fetch restamped the window.
		let read = cache.volume(t0 + Duration::from_millis(3000));
		assert_eq!(read, Some(volume(40.0)));

		// Past the restamped window everything misses again.
		assert_eq!(cache.volume(t0 + Duration::from_millis(3600)), None);
		assert_eq!(cache.track_info(t0 + Duration::from_millis(3600)), None);
	}

	#[test]
	fn staleness_is_evaluated_per_read() {
		let cache = StatusCache::new(ttl());
		let t0 = Instant::now();

		cache.put_track_time(
			TrackTime {
				current_time: "0:10".to_string(),
				total_time: "3:00".to_string(),
				progress: 10.0,
				max: 180.0,
				percent: 5.5,
			},
			t0,
		);

		// A stale read does not clear the slot; a later put makes it fresh.
		assert_eq!(cache.track_time(t0 + Duration::from_millis(2500)), None);
		cache.put_volume(volume(10.0), t0 + Duration::from_millis(2600));
		assert!(cache.track_time(t0 + Duration::from_millis(2700)).is_some());
	}
}
