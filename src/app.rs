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

//! Main window: forwards input to the engine, ticks it once per frame and
//! paints what it exposes.

use std::time::Duration;

use chrono::Utc;
use eframe::egui;
use log::{debug, info};
use skywatch_core::engine::RefreshOutcome;
use skywatch_core::{Engine, ViewportSize};

use crate::opensky::OpenSkyFeed;
use crate::ui::{from_pos, map_view, overlay};

pub struct SkywatchApp {
    engine: Engine<OpenSkyFeed>,
    frame_interval: Duration,
}

impl std::fmt::Debug for SkywatchApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkywatchApp")
            .field("engine", &self.engine)
            .field("frame_interval", &self.frame_interval)
            .finish()
    }
}

impl SkywatchApp {
    pub fn new(engine: Engine<OpenSkyFeed>, frame_rate: u32) -> Self {
        let frame_interval = Duration::from_secs(1) / frame_rate.max(1);
        Self {
            engine,
            frame_interval,
        }
    }

    /// Mouse wheel, drag and hover, in viewport-local coordinates.
    fn handle_input(&mut self, ui: &egui::Ui, response: &egui::Response, rect: egui::Rect) {
        match response.hover_pos() {
            Some(pos) => self.engine.pointer_moved(from_pos(rect, pos)),
            None => self.engine.pointer_left(),
        }

        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll > 0.0 {
                self.engine.zoom_in();
            } else if scroll < 0.0 {
                self.engine.zoom_out();
            }
        }

        if response.dragged() {
            let delta = response.drag_delta();
            self.engine.pan(f64::from(delta.x), f64::from(delta.y));
        }

        if response.double_clicked() {
            self.engine.reset_view();
        }
    }

    fn draw_map(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;

        if !self.engine.resize(ViewportSize::new(f64::from(rect.width()), f64::from(rect.height()))) {
            // Minimized; keep ticking so the feed schedule holds.
            self.engine.tick(Utc::now());
            return;
        }

        self.handle_input(ui, &response, rect);

        let now = Utc::now();
        let report = self.engine.tick(now);
        match report.refresh {
            RefreshOutcome::Reconciled(summary) => debug!(
                "Frame {}: {} aircraft ({} new, {} expired)",
                report.frame,
                self.engine.store().len(),
                summary.added,
                summary.evicted
            ),
            RefreshOutcome::NotDue | RefreshOutcome::Pending | RefreshOutcome::Failed => {}
        }

        map_view::draw_background(&painter, rect, &self.engine);
        for item in self.engine.render_items() {
            map_view::draw_trail(&painter, rect, &self.engine, &item);
            map_view::draw_aircraft(&painter, rect, &item);
        }

        let fps = ui.input(|i| i.stable_dt);
        let fps = if fps > 0.0 { 1.0 / fps } else { 0.0 };
        let cursor = self.engine.pointer().map(|p| self.engine.unproject(p));
        overlay::draw_stats(&painter, rect, &self.engine.stats(), fps, cursor, now);

        if let (Some(entity), Some(pos)) = (self.engine.hovered(), response.hover_pos()) {
            overlay::draw_hover_box(&painter, rect, pos, entity);
        }
    }
}

impl eframe::App for SkywatchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            info!("Escape pressed, closing");
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        // Interpolation advances once per frame, so keep frames coming.
        ctx.request_repaint_after(self.frame_interval);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(map_view::COLOR_BACKGROUND))
            .show(ctx, |ui| {
                self.draw_map(ui);
            });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.engine.feed_source_mut().shutdown();
    }
}
