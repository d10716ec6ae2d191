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

//! Live aircraft tracking core.
//!
//! This library keeps a set of aircraft in sync with a periodically polled
//! position feed and turns their positions into smooth, zoomable screen
//! coordinates. It is split into layers that can be used on their own:
//!
//! - **Transform layer**: region bounds, geographic-to-screen projection with
//!   zoom and pan, and the inverse
//! - **Tracker layer**: per-aircraft interpolation state and the insertion-ordered
//!   store that reconciles feed snapshots and expires departed aircraft
//! - **Feed layer**: the snapshot contract, an OpenSky response parser, and a
//!   rate limiter that never polls faster than the update interval
//! - **Engine**: the per-frame driver tying the layers together, with
//!   hit-testing for hover
//!
//! Nothing here draws or performs I/O; a presentation layer feeds the engine
//! input and renders what it exposes.
//!
//! # Quick Start
//!
//! ```
//! use chrono::{TimeDelta, Utc};
//! use skywatch_core::feed::{Feed, FeedError, RawRecord};
//! use skywatch_core::{Bounds, Engine, EngineConfig, ViewportSize};
//!
//! struct OnePlane;
//!
//! impl Feed for OnePlane {
//!     fn fetch_snapshot(&mut self) -> Result<Vec<RawRecord>, FeedError> {
//!         Ok(vec![RawRecord {
//!             identity: Some("84c0b1".to_string()),
//!             label: Some("JAL006".to_string()),
//!             latitude: Some(35.68),
//!             longitude: Some(139.76),
//!             ..Default::default()
//!         }])
//!     }
//! }
//!
//! let bounds = Bounds::new(-10.0, 55.0, 60.0, 150.0).unwrap();
//! let mut engine = Engine::new(
//!     EngineConfig::default(),
//!     bounds,
//!     ViewportSize::new(1200.0, 800.0),
//!     OnePlane,
//! )
//! .unwrap();
//!
//! let start = Utc::now();
//! for frame in 0..60 {
//!     engine.tick(start + TimeDelta::milliseconds(frame * 16));
//! }
//!
//! for item in engine.render_items() {
//!     let (x, y) = item.screen.to_pixel();
//!     println!("{} at ({x}, {y})", item.label);
//! }
//! assert_eq!(engine.stats().entity_count, 1);
//! ```
//!
//! # Using Individual Layers
//!
//! ## Transform Layer Only
//!
//! ```
//! use skywatch_core::transform::{geo_to_screen, Bounds, GeoPoint, ViewportSize, ViewportState};
//!
//! let bounds = Bounds::new(-10.0, 55.0, 60.0, 150.0).unwrap();
//! let center = geo_to_screen(
//!     GeoPoint::new(22.5, 105.0),
//!     ViewportSize::new(1200.0, 800.0),
//!     &bounds,
//!     &ViewportState::default(),
//! );
//! assert_eq!(center.to_pixel(), (600, 400));
//! ```
//!
//! ## Tracker Layer Only
//!
//! ```
//! use chrono::Utc;
//! use skywatch_core::feed::RawRecord;
//! use skywatch_core::tracker::{EntityStore, StoreConfig};
//! use skywatch_core::transform::Bounds;
//!
//! let bounds = Bounds::new(-10.0, 55.0, 60.0, 150.0).unwrap();
//! let mut store = EntityStore::new(bounds, StoreConfig::default());
//!
//! let summary = store.reconcile(
//!     &[RawRecord {
//!         identity: Some("a1b2c3".to_string()),
//!         latitude: Some(1.35),
//!         longitude: Some(103.99),
//!         ..Default::default()
//!     }],
//!     Utc::now(),
//! );
//!
//! assert_eq!(summary.added, 1);
//! println!("Tracking {} aircraft", store.len());
//! ```

pub mod engine;
pub mod feed;
pub mod tracker;
pub mod transform;

pub use engine::{
    ConfigError, Engine, EngineConfig, EngineStats, RefreshOutcome, RenderItem, TickReport,
};
pub use feed::{Feed, FeedError, FeedHealth, ParseError, RateLimitedFeed, RawRecord};
pub use tracker::{
    ColorKey, Entity, EntityStore, EvictionPolicy, ReconcileSummary, StoreConfig, StoreEvent,
};
pub use transform::{
    geo_to_screen, rotate_point, screen_to_geo, Bounds, BoundsError, GeoPoint, ScreenPoint,
    ViewportSize, ViewportState,
};
