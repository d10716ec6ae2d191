// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Frame and update scheduler.
//!
//! [`Engine`] owns the tracked aircraft, the rate-limited feed and the
//! viewport. The presentation layer drives it with three kinds of input
//! (pointer moves, zoom steps, and one [`Engine::tick`] per frame) and reads
//! back [`RenderItem`]s plus the [`ViewportState`] to draw with.
//!
//! A tick always runs in the same order: advance interpolation, refresh from
//! the feed if the update interval has elapsed, then refresh the hover target.

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::feed::{
    Feed, FeedHealth, FeedPoll, RateLimitedFeed, DEFAULT_UPDATE_INTERVAL_SECS,
};
use crate::tracker::{
    ColorKey, Entity, EntityStore, EvictionPolicy, MotionLimits, ReconcileSummary, StoreConfig,
    StoreEvent, DEFAULT_GRACE_SECS, DEFAULT_INTERPOLATION_STEPS, DEFAULT_TRAIL_LENGTH,
};
use crate::transform::{
    geo_to_screen, screen_to_geo, Bounds, GeoPoint, ScreenPoint, ViewportSize,
    ViewportState,
};

/// Pointer distance, in pixels, within which an aircraft counts as hit.
pub const DEFAULT_HIT_RADIUS_PX: f64 = 20.0;
pub const ZOOM_MIN: f64 = 0.5;
pub const ZOOM_MAX: f64 = 3.0;
/// Zoom change per wheel notch.
pub const ZOOM_STEP: f64 = 0.1;

/// Invalid engine configuration. Always fatal at construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("interpolation steps must be at least 1")]
    ZeroSteps,

    #[error("trail length must be at least 1")]
    ZeroTrailLength,

    #[error("update interval must be a positive, representable number of seconds, got {0}")]
    UpdateInterval(i64),

    #[error("grace window must be a non-negative, representable number of seconds, got {0}")]
    GraceWindow(i64),

    #[error("hit radius must be a positive number of pixels, got {0}")]
    HitRadius(f64),

    #[error("invalid zoom range [{min}, {max}] with step {step}")]
    ZoomRange { min: f64, max: f64, step: f64 },

    #[error("invalid viewport size {width}x{height}")]
    ViewportSize { width: f64, height: f64 },
}

/// Tunables for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minimum seconds between feed requests.
    pub update_interval_secs: i64,
    pub interpolation_steps: u32,
    pub trail_length: usize,
    /// Seconds an aircraft may be missing before it is expired.
    pub grace_secs: i64,
    pub eviction: EvictionPolicy,
    pub hit_radius_px: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub zoom_step: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            interpolation_steps: DEFAULT_INTERPOLATION_STEPS,
            trail_length: DEFAULT_TRAIL_LENGTH,
            grace_secs: DEFAULT_GRACE_SECS,
            eviction: EvictionPolicy::default(),
            hit_radius_px: DEFAULT_HIT_RADIUS_PX,
            zoom_min: ZOOM_MIN,
            zoom_max: ZOOM_MAX,
            zoom_step: ZOOM_STEP,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interpolation_steps == 0 {
            return Err(ConfigError::ZeroSteps);
        }
        if self.trail_length == 0 {
            return Err(ConfigError::ZeroTrailLength);
        }
        self.update_interval()?;
        self.grace_window()?;
        if !(self.hit_radius_px.is_finite() && self.hit_radius_px > 0.0) {
            return Err(ConfigError::HitRadius(self.hit_radius_px));
        }
        let zoom_ok = self.zoom_min.is_finite()
            && self.zoom_max.is_finite()
            && self.zoom_step.is_finite()
            && self.zoom_min > 0.0
            && self.zoom_min <= 1.0
            && self.zoom_max >= 1.0
            && self.zoom_step > 0.0;
        if !zoom_ok {
            return Err(ConfigError::ZoomRange {
                min: self.zoom_min,
                max: self.zoom_max,
                step: self.zoom_step,
            });
        }
        Ok(())
    }

    /// Minimum time between feed requests.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UpdateInterval`] when the interval is not positive or
    /// does not fit in a [`TimeDelta`].
    pub fn update_interval(&self) -> Result<TimeDelta, ConfigError> {
        TimeDelta::try_seconds(self.update_interval_secs)
            .filter(|interval| *interval > TimeDelta::zero())
            .ok_or(ConfigError::UpdateInterval(self.update_interval_secs))
    }

    /// Time a missing aircraft is kept before it is expired.
    ///
    /// # Errors
    ///
    /// [`ConfigError::GraceWindow`] when the window is negative or does not
    /// fit in a [`TimeDelta`].
    pub fn grace_window(&self) -> Result<TimeDelta, ConfigError> {
        TimeDelta::try_seconds(self.grace_secs)
            .filter(|grace| *grace >= TimeDelta::zero())
            .ok_or(ConfigError::GraceWindow(self.grace_secs))
    }

    fn store_config(&self, grace: TimeDelta) -> StoreConfig {
        StoreConfig {
            limits: MotionLimits {
                steps: self.interpolation_steps,
                trail_length: self.trail_length,
            },
            grace,
            eviction: self.eviction,
            ..Default::default()
        }
    }
}

/// Everything the drawing layer needs for one aircraft.
#[derive(Debug, Clone)]
pub struct RenderItem<'a> {
    pub identity: &'a str,
    pub label: &'a str,
    pub color: ColorKey,
    pub display: GeoPoint,
    /// `display` projected with the current viewport state.
    pub screen: ScreenPoint,
    pub heading: Option<f64>,
    pub trail: &'a VecDeque<GeoPoint>,
    pub hovered: bool,
}

/// What happened to the feed during a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The update interval had not elapsed.
    #[default]
    NotDue,
    /// A background request is in flight.
    Pending,
    Reconciled(ReconcileSummary),
    /// The request failed; state was left untouched.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub frame: u64,
    pub refresh: RefreshOutcome,
}

/// Snapshot of engine state for status overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStats {
    pub entity_count: usize,
    pub zoom: f64,
    pub frame: u64,
    pub feed: FeedHealth,
}

/// Per-frame driver for tracking, interpolation and hit-testing.
pub struct Engine<F> {
    config: EngineConfig,
    store: EntityStore,
    feed: RateLimitedFeed<F>,
    size: ViewportSize,
    view: ViewportState,
    pointer: Option<ScreenPoint>,
    hovered: Option<String>,
    frame: u64,
}

impl<F> std::fmt::Debug for Engine<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("size", &self.size)
            .field("view", &self.view)
            .field("hovered", &self.hovered)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

impl<F: Feed> Engine<F> {
    pub fn new(
        config: EngineConfig,
        bounds: Bounds,
        size: ViewportSize,
        feed: F,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if !size.is_valid() {
            return Err(ConfigError::ViewportSize {
                width: size.width,
                height: size.height,
            });
        }

        let interval = config.update_interval()?;
        let store = EntityStore::new(bounds, config.store_config(config.grace_window()?));
        let feed = RateLimitedFeed::new(feed, interval);

        Ok(Self {
            config,
            store,
            feed,
            size,
            view: ViewportState::default(),
            pointer: None,
            hovered: None,
            frame: 0,
        })
    }

    // --- input commands ---

    pub fn pointer_moved(&mut self, position: ScreenPoint) {
        self.pointer = Some(position);
    }

    pub fn pointer_left(&mut self) {
        self.pointer = None;
        self.hovered = None;
    }

    /// Change zoom by `delta`, clamped to the configured range. Zoom is
    /// always about the viewport center. Returns the new zoom.
    pub fn zoom(&mut self, delta: f64) -> f64 {
        if delta.is_finite() {
            self.view.zoom = (self.view.zoom + delta).clamp(self.config.zoom_min, self.config.zoom_max);
        }
        self.view.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.zoom(self.config.zoom_step)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.zoom(-self.config.zoom_step)
    }

    /// Translate the view by a pixel offset (applied after zoom).
    pub fn pan(&mut self, dx: f64, dy: f64) {
        if dx.is_finite() && dy.is_finite() {
            self.view.pan_x += dx;
            self.view.pan_y += dy;
        }
    }

    pub fn reset_view(&mut self) {
        self.view = ViewportState::default();
    }

    /// Track a new viewport size. Unusable sizes (minimized window) are
    /// ignored and the previous size is kept.
    pub fn resize(&mut self, size: ViewportSize) -> bool {
        if size.is_valid() {
            self.size = size;
            true
        } else {
            false
        }
    }

    /// Run one frame.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        self.frame += 1;

        self.store.advance_all();

        let refresh = match self.feed.poll(now) {
            FeedPoll::Throttled => RefreshOutcome::NotDue,
            FeedPoll::Pending => RefreshOutcome::Pending,
            FeedPoll::Fresh(records) => {
                let summary = self.store.reconcile(records, now);
                RefreshOutcome::Reconciled(summary)
            }
            FeedPoll::Failed(e) => {
                debug!("Tick {} kept previous state: {}", self.frame, e);
                RefreshOutcome::Failed
            }
        };

        self.hovered = self
            .pointer
            .and_then(|p| self.hit_test(p).map(str::to_string));

        TickReport {
            frame: self.frame,
            refresh,
        }
    }

    // --- queries ---

    /// First aircraft, in insertion order, whose projected display position
    /// lies strictly within the hit radius of `pointer`. Not necessarily the
    /// nearest one.
    #[must_use]
    pub fn hit_test(&self, pointer: ScreenPoint) -> Option<&str> {
        self.store
            .iter()
            .find(|entity| {
                let (x, y) = self.project(entity.display_position()).to_pixel();
                ScreenPoint::new(f64::from(x), f64::from(y)).distance_to(pointer)
                    < self.config.hit_radius_px
            })
            .map(Entity::identity)
    }

    /// Project a geographic position with the current viewport.
    #[must_use]
    pub fn project(&self, point: GeoPoint) -> ScreenPoint {
        geo_to_screen(point, self.size, self.store.bounds(), &self.view)
    }

    /// Geographic position under a screen point.
    #[must_use]
    pub fn unproject(&self, point: ScreenPoint) -> GeoPoint {
        screen_to_geo(point, self.size, self.store.bounds(), &self.view)
    }

    /// Renderable aircraft in insertion order.
    pub fn render_items(&self) -> impl Iterator<Item = RenderItem<'_>> + '_ {
        self.store.iter().map(move |entity| {
            let display = entity.display_position();
            RenderItem {
                identity: entity.identity(),
                label: entity.label(),
                color: entity.color(),
                display,
                screen: self.project(display),
                heading: entity.heading(),
                trail: entity.trail(),
                hovered: self.hovered.as_deref() == Some(entity.identity()),
            }
        })
    }

    #[must_use]
    pub fn hovered(&self) -> Option<&Entity> {
        self.hovered.as_deref().and_then(|id| self.store.get(id))
    }

    #[must_use]
    pub fn pointer(&self) -> Option<ScreenPoint> {
        self.pointer
    }

    #[must_use]
    pub fn viewport_state(&self) -> ViewportState {
        self.view
    }

    #[must_use]
    pub fn viewport_size(&self) -> ViewportSize {
        self.size
    }

    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        self.store.bounds()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    #[must_use]
    pub fn feed(&self) -> &RateLimitedFeed<F> {
        &self.feed
    }

    /// The wrapped feed source, e.g. to shut down a background worker.
    pub fn feed_source_mut(&mut self) -> &mut F {
        self.feed.inner_mut()
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            entity_count: self.store.len(),
            zoom: self.view.zoom,
            frame: self.frame,
            feed: self.feed.health(),
        }
    }
}
