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

//! Text overlays drawn on top of the map.

use chrono::{DateTime, Utc};
use eframe::egui;
use skywatch_core::{EngineStats, Entity, FeedHealth, GeoPoint};

use super::map_view::color;

const COLOR_TEXT: egui::Color32 = egui::Color32::WHITE;
const COLOR_LEGEND: egui::Color32 = egui::Color32::from_rgb(180, 180, 180);
const COLOR_HOVER_BG: egui::Color32 = egui::Color32::from_rgba_premultiplied(31, 47, 63, 200);

const HOVER_WIDTH: f32 = 250.0;
const HOVER_PADDING: f32 = 10.0;
const HOVER_LINE_HEIGHT: f32 = 20.0;
/// Distance between the pointer and the hover box
const HOVER_OFFSET: f32 = 20.0;

const CONTROLS: [&str; 5] = [
    "Controls:",
    "Mouse Wheel: Zoom",
    "Drag: Pan  |  Double-click: Reset",
    "Hover: Show Info",
    "ESC: Exit",
];

/// Top-left corner of the hover box: below-right of the pointer, flipped to
/// the other side on each axis where it would leave `bounds`.
pub fn hover_box_origin(pointer: egui::Pos2, size: egui::Vec2, bounds: egui::Rect) -> egui::Pos2 {
    let mut x = pointer.x + HOVER_OFFSET;
    let mut y = pointer.y + HOVER_OFFSET;
    if x + size.x > bounds.right() {
        x = pointer.x - size.x - HOVER_OFFSET;
    }
    if y + size.y > bounds.bottom() {
        y = pointer.y - size.y - HOVER_OFFSET;
    }
    egui::pos2(x, y)
}

/// Flight details next to the pointer, outlined in the aircraft's color.
#[allow(
    clippy::cast_precision_loss,
    reason = "a handful of info lines"
)]
pub fn draw_hover_box(painter: &egui::Painter, rect: egui::Rect, pointer: egui::Pos2, entity: &Entity) {
    let lines = entity.info_lines();
    let size = egui::vec2(
        HOVER_WIDTH,
        lines.len() as f32 * HOVER_LINE_HEIGHT + HOVER_PADDING * 2.0,
    );
    let box_rect = egui::Rect::from_min_size(hover_box_origin(pointer, size, rect), size);

    painter.rect_filled(box_rect, 0.0, COLOR_HOVER_BG);
    painter.rect_stroke(
        box_rect,
        0.0,
        egui::Stroke::new(2.0, color(entity.color())),
        egui::StrokeKind::Inside,
    );

    for (i, line) in lines.iter().enumerate() {
        painter.text(
            box_rect.min + egui::vec2(HOVER_PADDING, HOVER_PADDING + i as f32 * HOVER_LINE_HEIGHT),
            egui::Align2::LEFT_TOP,
            line,
            egui::FontId::proportional(16.0),
            COLOR_TEXT,
        );
    }
}

/// One-line feed status for the stats block.
pub fn feed_status(health: &FeedHealth, now: DateTime<Utc>) -> String {
    let age = health
        .last_success
        .map(|at| (now - at).num_seconds().max(0));

    match (age, health.consecutive_failures) {
        (None, 0) => "Feed: waiting for first snapshot".to_string(),
        (None, n) => format!("Feed: {n} failed request(s), retrying"),
        (Some(secs), 0) => format!("Feed: updated {secs} s ago ({} records)", health.cached_records),
        (Some(secs), n) => format!("Feed: {n} failed request(s), last update {secs} s ago"),
    }
}

/// Title, live counters, cursor position and the controls legend.
#[allow(
    clippy::cast_precision_loss,
    reason = "a handful of overlay lines"
)]
pub fn draw_stats(
    painter: &egui::Painter,
    rect: egui::Rect,
    stats: &EngineStats,
    fps: f32,
    cursor: Option<GeoPoint>,
    now: DateTime<Utc>,
) {
    painter.text(
        rect.left_top() + egui::vec2(10.0, 10.0),
        egui::Align2::LEFT_TOP,
        "Real-Time Aircraft Tracking",
        egui::FontId::proportional(20.0),
        COLOR_TEXT,
    );

    let mut lines = vec![
        format!("Aircraft Tracked: {}", stats.entity_count),
        format!("Zoom: {:.2}x", stats.zoom),
        format!("FPS: {fps:.0}"),
        feed_status(&stats.feed, now),
    ];
    if let Some(p) = cursor {
        lines.push(format!("Cursor: {:.3}°, {:.3}°", p.lat, p.lon));
    }

    for (i, line) in lines.iter().enumerate() {
        painter.text(
            rect.left_top() + egui::vec2(10.0, 50.0 + i as f32 * 20.0),
            egui::Align2::LEFT_TOP,
            line,
            egui::FontId::proportional(12.0),
            COLOR_TEXT,
        );
    }

    let legend_top = rect.bottom() - CONTROLS.len() as f32 * 18.0 - 10.0;
    for (i, line) in CONTROLS.iter().enumerate() {
        painter.text(
            egui::pos2(rect.left() + 10.0, legend_top + i as f32 * 18.0),
            egui::Align2::LEFT_TOP,
            *line,
            egui::FontId::proportional(12.0),
            COLOR_LEGEND,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_hover_box_flips_at_edges() {
        let screen = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1200.0, 800.0));
        let size = egui::vec2(250.0, 120.0);

        let origin = hover_box_origin(egui::pos2(100.0, 100.0), size, screen);
        assert_eq!(origin, egui::pos2(120.0, 120.0));

        let origin = hover_box_origin(egui::pos2(1100.0, 750.0), size, screen);
        assert_eq!(origin, egui::pos2(830.0, 610.0));
    }

    #[test]
    fn test_feed_status_text() {
        let mut health = FeedHealth::default();
        assert_eq!(feed_status(&health, at(0)), "Feed: waiting for first snapshot");

        health.consecutive_failures = 2;
        assert_eq!(feed_status(&health, at(0)), "Feed: 2 failed request(s), retrying");

        health.consecutive_failures = 0;
        health.last_success = Some(at(0));
        health.cached_records = 42;
        assert_eq!(feed_status(&health, at(7)), "Feed: updated 7 s ago (42 records)");

        health.consecutive_failures = 1;
        assert_eq!(
            feed_status(&health, at(15)),
            "Feed: 1 failed request(s), last update 15 s ago"
        );
    }
}
