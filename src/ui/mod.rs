//! UI components for Skywatch Desktop.
//!
//! Drawing is split into the map itself (grid, trails, aircraft glyphs) and
//! the overlays painted on top of it (hover box, stats, controls legend).

pub mod map_view;
pub mod overlay;

use eframe::egui;
use skywatch_core::ScreenPoint;

/// Viewport-local screen point to an egui position inside `rect`, snapped to
/// whole pixels.
#[allow(
    clippy::cast_precision_loss,
    reason = "pixel coordinates are far inside the exact range of f32"
)]
pub fn to_pos(rect: egui::Rect, point: ScreenPoint) -> egui::Pos2 {
    let (x, y) = point.to_pixel();
    rect.min + egui::vec2(x as f32, y as f32)
}

/// egui position to a viewport-local screen point.
pub fn from_pos(rect: egui::Rect, pos: egui::Pos2) -> ScreenPoint {
    let local = pos - rect.min;
    ScreenPoint::new(f64::from(local.x), f64::from(local.y))
}
