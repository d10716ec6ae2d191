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

//! Geographic-to-screen coordinate transforms.
//!
//! Positions are mapped into viewport pixels through a fixed pipeline:
//!
//! 1. normalize into `[0, 1]²` using the region [`Bounds`] (longitude grows to
//!    the right, latitude grows upward so screen Y is inverted),
//! 2. scale by the viewport size,
//! 3. zoom about the viewport center: `p' = c + (p - c) * zoom`,
//! 4. translate by the pan offset.
//!
//! Everything stays in `f64`; rounding to whole pixels only happens at the
//! drawing edge through [`ScreenPoint::to_pixel`].

use thiserror::Error;

/// Errors raised when constructing a region of interest.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoundsError {
    #[error("{axis} bound is not a finite number")]
    NotFinite { axis: &'static str },

    #[error("degenerate {axis} range: min {min} must be strictly less than max {max}")]
    Degenerate {
        axis: &'static str,
        min: f64,
        max: f64,
    },
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// A position in viewport pixel space, kept in floating point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Round down to whole display pixels.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "screen coordinates of on-screen and near-screen entities fit in i32"
    )]
    pub fn to_pixel(self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }

    #[must_use]
    pub fn distance_to(self, other: ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    /// Whether both dimensions are usable as a scale factor.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Zoom and pan applied on top of the base projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

/// Immutable geographic rectangle used for filtering and normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

fn check_axis(axis: &'static str, min: f64, max: f64) -> Result<(), BoundsError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(BoundsError::NotFinite { axis });
    }
    if min >= max {
        return Err(BoundsError::Degenerate { axis, min, max });
    }
    Ok(())
}

impl Bounds {
    /// Build a region, rejecting zero-width or inverted ranges up front so
    /// that normalization can never divide by zero.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self, BoundsError> {
        check_axis("latitude", min_lat, max_lat)?;
        check_axis("longitude", min_lon, max_lon)?;
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    #[must_use]
    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    #[must_use]
    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    #[must_use]
    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    #[must_use]
    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    /// Inclusive containment check on both axes.
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }

    /// Map a position into unit space: x grows east, y grows south.
    #[must_use]
    pub fn normalize(&self, point: GeoPoint) -> (f64, f64) {
        let nx = (point.lon - self.min_lon) / (self.max_lon - self.min_lon);
        let ny = (self.max_lat - point.lat) / (self.max_lat - self.min_lat);
        (nx, ny)
    }

    /// Inverse of [`Bounds::normalize`].
    #[must_use]
    pub fn denormalize(&self, nx: f64, ny: f64) -> GeoPoint {
        GeoPoint::new(
            self.max_lat - ny * (self.max_lat - self.min_lat),
            self.min_lon + nx * (self.max_lon - self.min_lon),
        )
    }
}

/// Project a geographic position into viewport pixels.
#[must_use]
pub fn geo_to_screen(
    point: GeoPoint,
    size: ViewportSize,
    bounds: &Bounds,
    state: &ViewportState,
) -> ScreenPoint {
    let (nx, ny) = bounds.normalize(point);
    let center = size.center();

    let x = nx * size.width;
    let y = ny * size.height;

    let x = center.x + (x - center.x) * state.zoom;
    let y = center.y + (y - center.y) * state.zoom;

    ScreenPoint::new(x + state.pan_x, y + state.pan_y)
}

/// Undo [`geo_to_screen`]. The zoom factor and viewport size must be
/// non-zero, which the engine guarantees by clamping and validation.
#[must_use]
pub fn screen_to_geo(
    screen: ScreenPoint,
    size: ViewportSize,
    bounds: &Bounds,
    state: &ViewportState,
) -> GeoPoint {
    let center = size.center();

    let x = center.x + (screen.x - state.pan_x - center.x) / state.zoom;
    let y = center.y + (screen.y - state.pan_y - center.y) / state.zoom;

    bounds.denormalize(x / size.width, y / size.height)
}

/// Rotate a point about the origin by `angle_degrees` (rotation matrix).
///
/// In screen space (Y down) a positive angle turns clockwise, which matches
/// compass headings.
#[must_use]
pub fn rotate_point(x: f64, y: f64, angle_degrees: f64) -> (f64, f64) {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asia() -> Bounds {
        Bounds::new(-10.0, 55.0, 60.0, 150.0).unwrap()
    }

    const SIZE: ViewportSize = ViewportSize::new(1200.0, 800.0);

    #[test]
    fn test_tokyo_projection() {
        let tokyo = GeoPoint::new(35.68, 139.76);
        let p = geo_to_screen(tokyo, SIZE, &asia(), &ViewportState::default());
        assert!((p.x - 1063.4667).abs() < 0.001);
        assert!((p.y - 237.7846).abs() < 0.001);
        assert_eq!(p.to_pixel(), (1063, 237));
    }

    #[test]
    fn test_corners_map_to_viewport_corners() {
        let state = ViewportState::default();
        let nw = geo_to_screen(GeoPoint::new(55.0, 60.0), SIZE, &asia(), &state);
        let se = geo_to_screen(GeoPoint::new(-10.0, 150.0), SIZE, &asia(), &state);
        assert_eq!(nw, ScreenPoint::new(0.0, 0.0));
        assert_eq!(se, ScreenPoint::new(1200.0, 800.0));
    }

    #[test]
    fn test_zoom_is_about_center() {
        let state = ViewportState {
            zoom: 2.5,
            ..Default::default()
        };
        let bounds = asia();
        let center_geo = bounds.denormalize(0.5, 0.5);
        let p = geo_to_screen(center_geo, SIZE, &bounds, &state);
        assert!((p.x - 600.0).abs() < 1e-9);
        assert!((p.y - 400.0).abs() < 1e-9);

        let tokyo = geo_to_screen(GeoPoint::new(35.68, 139.76), SIZE, &bounds, &state);
        assert!((tokyo.x - (600.0 + (1063.4667 - 600.0) * 2.5)).abs() < 0.01);
    }

    #[test]
    fn test_pan_applied_after_zoom() {
        let state = ViewportState {
            zoom: 2.0,
            pan_x: 15.0,
            pan_y: -40.0,
        };
        let p = geo_to_screen(GeoPoint::new(55.0, 60.0), SIZE, &asia(), &state);
        // (0,0) zoomed about (600,400) lands at (-600,-400); pan is not scaled.
        assert_eq!(p, ScreenPoint::new(-585.0, -440.0));
    }

    #[test]
    fn test_screen_to_geo_inverse() {
        let bounds = asia();
        let state = ViewportState::default();
        for &(lat, lon) in &[(35.68, 139.76), (1.35, 103.99), (-10.0, 60.0), (22.3, 114.2)] {
            let screen = geo_to_screen(GeoPoint::new(lat, lon), SIZE, &bounds, &state);
            let back = screen_to_geo(screen, SIZE, &bounds, &state);
            assert!((back.lat - lat).abs() < 1e-9);
            assert!((back.lon - lon).abs() < 1e-9);
        }

        // Through whole pixels the error is bounded by one pixel's extent.
        let pixel = geo_to_screen(GeoPoint::new(35.68, 139.76), SIZE, &bounds, &state).to_pixel();
        let back = screen_to_geo(
            ScreenPoint::new(f64::from(pixel.0), f64::from(pixel.1)),
            SIZE,
            &bounds,
            &state,
        );
        assert!((back.lat - 35.68).abs() < 65.0 / 800.0);
        assert!((back.lon - 139.76).abs() < 90.0 / 1200.0);
    }

    #[test]
    fn test_screen_to_geo_with_zoom_and_pan() {
        let bounds = asia();
        let state = ViewportState {
            zoom: 1.7,
            pan_x: -120.0,
            pan_y: 33.0,
        };
        let screen = geo_to_screen(GeoPoint::new(13.7, 100.5), SIZE, &bounds, &state);
        let back = screen_to_geo(screen, SIZE, &bounds, &state);
        assert!((back.lat - 13.7).abs() < 1e-9);
        assert!((back.lon - 100.5).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_bounds_rejected() {
        assert_eq!(
            Bounds::new(10.0, 10.0, 60.0, 150.0),
            Err(BoundsError::Degenerate {
                axis: "latitude",
                min: 10.0,
                max: 10.0
            })
        );
        assert!(matches!(
            Bounds::new(-10.0, 55.0, 150.0, 60.0),
            Err(BoundsError::Degenerate { axis: "longitude", .. })
        ));
        assert!(matches!(
            Bounds::new(f64::NAN, 55.0, 60.0, 150.0),
            Err(BoundsError::NotFinite { axis: "latitude" })
        ));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let bounds = asia();
        assert!(bounds.contains(GeoPoint::new(-10.0, 60.0)));
        assert!(bounds.contains(GeoPoint::new(55.0, 150.0)));
        assert!(!bounds.contains(GeoPoint::new(55.0001, 100.0)));
        assert!(!bounds.contains(GeoPoint::new(20.0, 59.999)));
        assert!(!bounds.contains(GeoPoint::new(f64::NAN, 100.0)));
    }

    #[test]
    fn test_to_pixel_floors_negative() {
        assert_eq!(ScreenPoint::new(-0.5, 3.99).to_pixel(), (-1, 3));
    }

    #[test]
    fn test_rotate_point_quarter_turn() {
        let (x, y) = rotate_point(0.0, -10.0, 90.0);
        assert!((x - 10.0).abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }
}
