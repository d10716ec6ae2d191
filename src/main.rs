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

mod app;
mod config;
mod opensky;
mod ui;

use std::time::Duration;

use clap::Parser;
use eframe::egui;
use log::{info, warn};
use mimalloc::MiMalloc;
use skywatch_core::{Engine, ViewportSize};

use app::SkywatchApp;
use config::AppConfig;
use opensky::OpenSkyFeed;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Live aircraft positions over a configurable region
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print the configuration file path and exit
    #[arg(long, default_value_t = false)]
    config_path: bool,

    /// Override the feed endpoint
    #[arg(long, value_name = "URL")]
    feed_url: Option<String>,

    /// Override the seconds between feed requests
    #[arg(long, value_name = "SECS")]
    interval: Option<i64>,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    /// Do not write the configuration file back to disk
    #[arg(long, default_value_t = false)]
    no_save: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.config_path {
        println!("{}", AppConfig::get_config_path()?.display());
        return Ok(());
    }

    let mut config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Could not load configuration, using defaults: {}", e);
            AppConfig::default()
        }
    };
    if !args.no_save {
        // Writes out any keys added since the file was created.
        if let Err(e) = config.save() {
            warn!("Could not save configuration: {}", e);
        }
    }

    if let Some(url) = args.feed_url {
        config.feed_url = url;
    }
    if let Some(interval) = args.interval {
        config.update_interval_secs = interval;
    }

    info!("Starting Skywatch Desktop...");

    let bounds = config.bounds()?;
    let size = ViewportSize::new(f64::from(config.window_width), f64::from(config.window_height));
    let feed = OpenSkyFeed::spawn(
        config.request_url(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let engine = Engine::new(config.engine_config(), bounds, size, feed)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_title("Skywatch Desktop"),
        ..Default::default()
    };

    let frame_rate = config.frame_rate;
    eframe::run_native(
        "Skywatch Desktop",
        options,
        Box::new(move |_cc| Ok(Box::new(SkywatchApp::new(engine, frame_rate)))),
    )?;

    info!("Application closed");
    Ok(())
}
