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

//! Per-aircraft state with smooth interpolation between feed updates.
//!
//! An [`Entity`] keeps the last authoritative position from the feed (the
//! target), the point it was drawn at when that target arrived (the previous
//! position), and the interpolated point drawn this frame (the display
//! position). Each frame [`Entity::advance_interpolation`] moves the display
//! position one step of `STEPS` along the segment; after the last step it is
//! pinned exactly onto the target.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::transform::GeoPoint;

/// Frames used to glide from the previous position to a new target.
pub const DEFAULT_INTERPOLATION_STEPS: u32 = 30;
/// Positions kept in each trail.
pub const DEFAULT_TRAIL_LENGTH: usize = 20;

const UNKNOWN_LABEL: &str = "N/A";
const UNKNOWN_AIRLINE: &str = "UNK";
const MPS_TO_KMH: f64 = 3.6;

/// Linear interpolation `a + (b - a) * t`.
///
/// `t` outside `[0, 1]` extrapolates rather than failing.
#[must_use]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Deterministic display color derived from the airline prefix of a callsign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorKey {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorKey {
    /// Hash the first three characters of `label` (or `"UNK"` when shorter)
    /// into a channel triple in `55..=254`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let code: String = if label.chars().count() >= 3 {
            label.chars().take(3).collect()
        } else {
            UNKNOWN_AIRLINE.to_string()
        };
        let hash: u64 = code.chars().map(|c| u64::from(u32::from(c))).sum();

        Self {
            r: channel(hash, 67),
            g: channel(hash, 131),
            b: channel(hash, 197),
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "value is reduced modulo 200 and offset by 55, so it is at most 254"
)]
fn channel(hash: u64, multiplier: u64) -> u8 {
    ((hash * multiplier) % 200 + 55) as u8
}

/// Build the on-screen label from an optional callsign.
#[must_use]
pub fn display_label(callsign: Option<&str>) -> String {
    match callsign.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => UNKNOWN_LABEL.to_string(),
    }
}

/// Optional flight data carried alongside a position.
///
/// Every field is independently optional; [`Telemetry::merge`] only replaces
/// values that are present in the update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    /// Track angle in degrees (0-360, north = 0, clockwise).
    pub heading: Option<f64>,
    /// Barometric altitude in meters.
    pub altitude: Option<f64>,
    /// Ground speed in meters per second.
    pub ground_speed: Option<f64>,
    /// Vertical rate in meters per second (positive = climb).
    pub vertical_rate: Option<f64>,
    pub on_ground: Option<bool>,
    pub country: Option<String>,
}

impl Telemetry {
    pub fn merge(&mut self, update: Telemetry) {
        if update.heading.is_some() {
            self.heading = update.heading;
        }
        if update.altitude.is_some() {
            self.altitude = update.altitude;
        }
        if update.ground_speed.is_some() {
            self.ground_speed = update.ground_speed;
        }
        if update.vertical_rate.is_some() {
            self.vertical_rate = update.vertical_rate;
        }
        if update.on_ground.is_some() {
            self.on_ground = update.on_ground;
        }
        if update.country.is_some() {
            self.country = update.country;
        }
    }
}

/// Interpolation and trail sizing shared by every entity in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionLimits {
    pub steps: u32,
    pub trail_length: usize,
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            steps: DEFAULT_INTERPOLATION_STEPS,
            trail_length: DEFAULT_TRAIL_LENGTH,
        }
    }
}

/// A tracked aircraft.
#[derive(Debug, Clone)]
pub struct Entity {
    identity: String,
    label: String,
    color: ColorKey,
    target: GeoPoint,
    previous: GeoPoint,
    display: GeoPoint,
    progress: u32,
    telemetry: Telemetry,
    trail: VecDeque<GeoPoint>,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    limits: MotionLimits,
}

impl Entity {
    /// Create an entity at its first sighting. It starts settled: display,
    /// previous and target all equal `position`, and the trail holds just
    /// that point.
    #[must_use]
    pub fn new(
        identity: String,
        callsign: Option<&str>,
        position: GeoPoint,
        telemetry: Telemetry,
        now: DateTime<Utc>,
        limits: MotionLimits,
    ) -> Self {
        let label = display_label(callsign);
        let color = ColorKey::from_label(&label);
        let mut trail = VecDeque::with_capacity(limits.trail_length + 1);
        trail.push_back(position);

        Self {
            identity,
            label,
            color,
            target: position,
            previous: position,
            display: position,
            progress: limits.steps,
            telemetry,
            trail,
            first_seen: now,
            last_seen: now,
            limits,
        }
    }

    /// Accept a new authoritative position and restart interpolation from
    /// wherever the entity is currently drawn.
    pub fn update_target(&mut self, position: GeoPoint, telemetry: Telemetry, now: DateTime<Utc>) {
        self.previous = self.display;
        self.target = position;
        self.telemetry.merge(telemetry);
        self.progress = 0;
        self.last_seen = now;

        self.trail.push_back(position);
        while self.trail.len() > self.limits.trail_length {
            self.trail.pop_front();
        }
    }

    /// Move one interpolation step toward the target and return the new
    /// display position. A no-op once the target has been reached.
    pub fn advance_interpolation(&mut self) -> GeoPoint {
        if self.progress < self.limits.steps {
            let t = f64::from(self.progress) / f64::from(self.limits.steps);
            self.display = GeoPoint::new(
                lerp(self.previous.lat, self.target.lat, t),
                lerp(self.previous.lon, self.target.lon, t),
            );
            self.progress += 1;
        }
        if self.progress >= self.limits.steps {
            self.display = self.target;
        }
        self.display
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn color(&self) -> ColorKey {
        self.color
    }

    #[must_use]
    pub fn target_position(&self) -> GeoPoint {
        self.target
    }

    #[must_use]
    pub fn previous_position(&self) -> GeoPoint {
        self.previous
    }

    #[must_use]
    pub fn display_position(&self) -> GeoPoint {
        self.display
    }

    #[must_use]
    pub fn interpolation_progress(&self) -> u32 {
        self.progress
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.progress >= self.limits.steps
    }

    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    #[must_use]
    pub fn heading(&self) -> Option<f64> {
        self.telemetry.heading
    }

    #[must_use]
    pub fn altitude(&self) -> Option<f64> {
        self.telemetry.altitude
    }

    #[must_use]
    pub fn ground_speed(&self) -> Option<f64> {
        self.telemetry.ground_speed
    }

    #[must_use]
    pub fn speed_kmh(&self) -> Option<f64> {
        self.telemetry.ground_speed.map(|mps| mps * MPS_TO_KMH)
    }

    #[must_use]
    pub fn trail(&self) -> &VecDeque<GeoPoint> {
        &self.trail
    }

    #[must_use]
    pub fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    #[must_use]
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// Lines for the hover panel.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "values are rounded for display only"
    )]
    pub fn info_lines(&self) -> Vec<String> {
        let altitude = self
            .telemetry
            .altitude
            .map_or_else(|| UNKNOWN_LABEL.to_string(), |m| format!("{} m", m.round() as i64));
        let speed = self
            .speed_kmh()
            .map_or_else(|| UNKNOWN_LABEL.to_string(), |k| format!("{} km/h", k.round() as i64));
        let heading = self
            .telemetry
            .heading
            .map_or_else(|| UNKNOWN_LABEL.to_string(), |h| format!("{}°", h.round() as i64));

        let mut lines = vec![
            format!("Flight: {}", self.label),
            format!("ICAO24: {}", self.identity),
            format!("Altitude: {altitude}"),
            format!("Speed: {speed}"),
            format!("Heading: {heading}"),
        ];
        if let Some(country) = &self.telemetry.country {
            lines.push(format!("Country: {country}"));
        }
        lines
    }
}
