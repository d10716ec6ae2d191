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

//! Map layer: background grid, flight trails and aircraft glyphs.

use eframe::egui;
use skywatch_core::{rotate_point, ColorKey, Engine, Feed, GeoPoint, RenderItem};

use super::to_pos;

pub const COLOR_BACKGROUND: egui::Color32 = egui::Color32::from_rgb(15, 25, 35);
const COLOR_GRID: egui::Color32 = egui::Color32::from_rgb(40, 60, 80);
const COLOR_TRAIL: egui::Color32 = egui::Color32::from_rgb(100, 150, 200);

/// Degrees between grid lines
const GRID_SPACING_DEG: f64 = 10.0;

/// Aircraft triangle pointing north, relative to its center
const GLYPH: [(f64, f64); 3] = [(0.0, -8.0), (-6.0, 8.0), (6.0, 8.0)];

/// Vertical offset of the callsign above the glyph
const LABEL_OFFSET_Y: f32 = -15.0;

pub fn color(key: ColorKey) -> egui::Color32 {
    egui::Color32::from_rgb(key.r, key.g, key.b)
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "glyph offsets are a few pixels"
)]
fn offset(dx: f64, dy: f64) -> egui::Vec2 {
    egui::vec2(dx as f32, dy as f32)
}

/// Fill the viewport and draw latitude/longitude lines every 10 degrees,
/// following the current zoom and pan.
pub fn draw_background<F: Feed>(painter: &egui::Painter, rect: egui::Rect, engine: &Engine<F>) {
    painter.rect_filled(rect, 0.0, COLOR_BACKGROUND);

    let bounds = engine.bounds();
    let stroke = egui::Stroke::new(1.0, COLOR_GRID);

    let mut lon = bounds.min_lon().floor();
    while lon < bounds.max_lon() {
        let p = to_pos(rect, engine.project(GeoPoint::new(bounds.min_lat(), lon)));
        painter.line_segment(
            [egui::pos2(p.x, rect.top()), egui::pos2(p.x, rect.bottom())],
            stroke,
        );
        lon += GRID_SPACING_DEG;
    }

    let mut lat = bounds.min_lat().floor();
    while lat < bounds.max_lat() {
        let p = to_pos(rect, engine.project(GeoPoint::new(lat, bounds.min_lon())));
        painter.line_segment(
            [egui::pos2(rect.left(), p.y), egui::pos2(rect.right(), p.y)],
            stroke,
        );
        lat += GRID_SPACING_DEG;
    }
}

/// Polyline through the reported positions, oldest first.
pub fn draw_trail<F: Feed>(
    painter: &egui::Painter,
    rect: egui::Rect,
    engine: &Engine<F>,
    item: &RenderItem<'_>,
) {
    if item.trail.len() < 2 {
        return;
    }

    let points: Vec<egui::Pos2> = item
        .trail
        .iter()
        .map(|p| to_pos(rect, engine.project(*p)))
        .collect();
    painter.add(egui::Shape::line(points, egui::Stroke::new(2.0, COLOR_TRAIL)));
}

/// Heading-rotated triangle with the callsign above it. Aircraft whose
/// display position falls outside the viewport are not drawn.
pub fn draw_aircraft(painter: &egui::Painter, rect: egui::Rect, item: &RenderItem<'_>) {
    let center = to_pos(rect, item.screen);
    if !rect.contains(center) {
        return;
    }

    let fill = color(item.color);
    let heading = item.heading.unwrap_or(0.0);
    let points: Vec<egui::Pos2> = GLYPH
        .iter()
        .map(|&(x, y)| {
            let (rx, ry) = rotate_point(x, y, heading);
            center + offset(rx, ry)
        })
        .collect();

    let outline = if item.hovered {
        egui::Stroke::new(2.0, egui::Color32::WHITE)
    } else {
        egui::Stroke::NONE
    };
    painter.add(egui::Shape::convex_polygon(points, fill, outline));

    painter.text(
        center + egui::vec2(0.0, LABEL_OFFSET_Y),
        egui::Align2::CENTER_BOTTOM,
        item.label,
        egui::FontId::proportional(12.0),
        fill,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_key() {
        let key = ColorKey::from_label("JAL006");
        let c = color(key);
        assert_eq!((c.r(), c.g(), c.b()), (key.r, key.g, key.b));
    }

    #[test]
    fn test_glyph_points_along_heading() {
        // Heading 90 turns the nose from north to east.
        let (nose_x, nose_y) = GLYPH[0];
        let (x, y) = rotate_point(nose_x, nose_y, 90.0);
        assert!((x - 8.0).abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }
}
