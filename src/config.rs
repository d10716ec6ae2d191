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

//! Application configuration management.
//!
//! This module handles persistent configuration storage using TOML format.
//! Every field has a serde default, so a partial or older file still loads
//! and missing keys are filled in on the next save.

use serde::{Deserialize, Serialize};
use skywatch_core::engine::{DEFAULT_HIT_RADIUS_PX, ZOOM_MAX, ZOOM_MIN, ZOOM_STEP};
use skywatch_core::feed::opensky;
use skywatch_core::feed::DEFAULT_UPDATE_INTERVAL_SECS;
use skywatch_core::tracker::{
    EvictionPolicy, DEFAULT_GRACE_SECS, DEFAULT_INTERPOLATION_STEPS, DEFAULT_TRAIL_LENGTH,
};
use skywatch_core::{Bounds, BoundsError, EngineConfig};

const APP_NAME: &str = "skywatch-desktop";
const CONFIG_NAME: &str = "config";

/// Geographic region of interest in degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct RegionConfig {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for RegionConfig {
    /// Asia, roughly India to Japan.
    fn default() -> Self {
        Self {
            min_lat: -10.0,
            max_lat: 55.0,
            min_lon: 60.0,
            max_lon: 150.0,
        }
    }
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// OpenSky-compatible `/states/all` endpoint
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Ask the feed for the region only instead of the whole world
    #[serde(default = "default_true")]
    pub request_region_only: bool,

    /// Seconds between feed requests
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: i64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub region: RegionConfig,

    /// Initial window size in logical pixels
    #[serde(default = "default_window_width")]
    pub window_width: f32,

    #[serde(default = "default_window_height")]
    pub window_height: f32,

    /// Target frame rate for repaints
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Frames used to glide between two reported positions
    #[serde(default = "default_interpolation_steps")]
    pub interpolation_steps: u32,

    /// Number of past reported positions drawn as a trail
    #[serde(default = "default_trail_length")]
    pub trail_length: usize,

    /// Seconds a missing aircraft is kept before it is dropped
    #[serde(default = "default_grace")]
    pub grace_secs: i64,

    /// `snapshot_gap` or `last_seen`
    #[serde(default)]
    pub eviction: EvictionPolicy,

    /// Hover radius in pixels
    #[serde(default = "default_hit_radius")]
    pub hit_radius_px: f64,

    #[serde(default = "default_zoom_min")]
    pub zoom_min: f64,

    #[serde(default = "default_zoom_max")]
    pub zoom_max: f64,

    /// Zoom change per mouse wheel notch
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_feed_url() -> String {
    opensky::DEFAULT_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_update_interval() -> i64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_request_timeout() -> u64 {
    10
}

fn default_window_width() -> f32 {
    1200.0
}

fn default_window_height() -> f32 {
    800.0
}

fn default_frame_rate() -> u32 {
    60
}

fn default_interpolation_steps() -> u32 {
    DEFAULT_INTERPOLATION_STEPS
}

fn default_trail_length() -> usize {
    DEFAULT_TRAIL_LENGTH
}

fn default_grace() -> i64 {
    DEFAULT_GRACE_SECS
}

fn default_hit_radius() -> f64 {
    DEFAULT_HIT_RADIUS_PX
}

fn default_zoom_min() -> f64 {
    ZOOM_MIN
}

fn default_zoom_max() -> f64 {
    ZOOM_MAX
}

fn default_zoom_step() -> f64 {
    ZOOM_STEP
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            feed_url: default_feed_url(),
            request_region_only: true,
            update_interval_secs: default_update_interval(),
            request_timeout_secs: default_request_timeout(),
            region: RegionConfig::default(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            frame_rate: default_frame_rate(),
            interpolation_steps: default_interpolation_steps(),
            trail_length: default_trail_length(),
            grace_secs: default_grace(),
            eviction: EvictionPolicy::default(),
            hit_radius_px: default_hit_radius(),
            zoom_min: default_zoom_min(),
            zoom_max: default_zoom_max(),
            zoom_step: default_zoom_step(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if absent
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Region of interest as validated core bounds
    pub fn bounds(&self) -> Result<Bounds, BoundsError> {
        let r = &self.region;
        Bounds::new(r.min_lat, r.max_lat, r.min_lon, r.max_lon)
    }

    /// Engine tunables. Validation happens when the engine is built.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            update_interval_secs: self.update_interval_secs,
            interpolation_steps: self.interpolation_steps,
            trail_length: self.trail_length,
            grace_secs: self.grace_secs,
            eviction: self.eviction,
            hit_radius_px: self.hit_radius_px,
            zoom_min: self.zoom_min,
            zoom_max: self.zoom_max,
            zoom_step: self.zoom_step,
        }
    }

    /// Feed URL with the OpenSky bounding-box query appended when
    /// `request_region_only` is set
    pub fn request_url(&self) -> String {
        if !self.request_region_only {
            return self.feed_url.clone();
        }
        let r = &self.region;
        let separator = if self.feed_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}lamin={}&lomin={}&lamax={}&lomax={}",
            self.feed_url, separator, r.min_lat, r.min_lon, r.max_lat, r.max_lon
        )
    }
}
