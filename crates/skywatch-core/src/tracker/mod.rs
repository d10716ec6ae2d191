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

//! Aircraft tracking and state management.
//!
//! [`EntityStore`] reconciles whole feed snapshots against the set of tracked
//! aircraft: new identities are created, known ones get a new interpolation
//! target, and aircraft missing from the feed are expired once the grace
//! window has passed. Records that cannot be used (no coordinates, outside the
//! region, no identity) are skipped without affecting the rest of the batch.

pub mod entity;

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::feed::RawRecord;
use crate::transform::{Bounds, GeoPoint};

pub use entity::{
    display_label, lerp, ColorKey, Entity, MotionLimits, Telemetry, DEFAULT_INTERPOLATION_STEPS,
    DEFAULT_TRAIL_LENGTH,
};

/// Time an aircraft may be missing from the feed before it is dropped.
pub const DEFAULT_GRACE_SECS: i64 = 60;

/// How aircraft absent from a snapshot are expired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Drop every absent aircraft at once, but only when the gap since the
    /// previous successful snapshot exceeds the grace window. A stale or
    /// rate-limited feed therefore never empties the map by itself.
    #[default]
    SnapshotGap,
    /// Drop absent aircraft individually once their own last sighting is
    /// older than the grace window.
    LastSeen,
}

/// Events emitted by the store when the tracked set changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A new aircraft was added to tracking.
    Added(String),
    /// An aircraft received a new target position.
    Updated(String),
    /// An aircraft was expired.
    Removed(String),
}

/// Configuration for the entity store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub limits: MotionLimits,
    /// How long an absent aircraft is kept.
    pub grace: TimeDelta,
    pub eviction: EvictionPolicy,
    /// Broadcast channel capacity for events.
    pub event_channel_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            limits: MotionLimits::default(),
            grace: TimeDelta::seconds(DEFAULT_GRACE_SECS),
            eviction: EvictionPolicy::default(),
            event_channel_capacity: 256,
        }
    }
}

/// Counts from one call to [`EntityStore::reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub received: usize,
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub evicted: usize,
}

/// Wrap a heading into `[0, 360)`. `rem_euclid` rounds tiny negative
/// angles up to exactly 360.
fn normalize_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// A record that passed validation, fully owned so that applying it to an
/// entity cannot fail halfway.
#[derive(Debug)]
struct Sighting {
    identity: String,
    callsign: Option<String>,
    position: GeoPoint,
    telemetry: Telemetry,
}

impl Sighting {
    fn from_record(record: &RawRecord, bounds: &Bounds) -> Option<Self> {
        // Coordinates are checked before anything else is read.
        let position = GeoPoint::new(record.latitude?, record.longitude?);
        if !position.is_finite() || !bounds.contains(position) {
            return None;
        }

        let identity = record.identity.as_deref().map(str::trim)?;
        if identity.is_empty() {
            return None;
        }

        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        let telemetry = Telemetry {
            heading: finite(record.heading_deg).map(normalize_heading),
            altitude: finite(record.altitude_m).map(|a| a.max(0.0)),
            ground_speed: finite(record.speed_mps).filter(|s| *s >= 0.0),
            vertical_rate: finite(record.vertical_rate_mps),
            on_ground: record.on_ground,
            country: record
                .country
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        };

        Some(Self {
            identity: identity.to_string(),
            callsign: record.label.clone(),
            position,
            telemetry,
        })
    }
}

/// Insertion-ordered collection of tracked aircraft.
pub struct EntityStore {
    entities: IndexMap<String, Entity>,
    bounds: Bounds,
    config: StoreConfig,
    last_snapshot_at: Option<DateTime<Utc>>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("entity_count", &self.entities.len())
            .field("bounds", &self.bounds)
            .field("last_snapshot_at", &self.last_snapshot_at)
            .finish_non_exhaustive()
    }
}

impl EntityStore {
    #[must_use]
    pub fn new(bounds: Bounds, config: StoreConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        Self {
            entities: IndexMap::new(),
            bounds,
            config,
            last_snapshot_at: None,
            event_tx,
        }
    }

    /// Merge one complete feed snapshot taken at `now`.
    pub fn reconcile(&mut self, records: &[RawRecord], now: DateTime<Utc>) -> ReconcileSummary {
        let mut summary = ReconcileSummary {
            received: records.len(),
            ..Default::default()
        };
        let mut seen: HashSet<String> = HashSet::with_capacity(records.len());

        for record in records {
            let Some(sighting) = Sighting::from_record(record, &self.bounds) else {
                summary.skipped += 1;
                continue;
            };
            let Sighting {
                identity,
                callsign,
                position,
                telemetry,
            } = sighting;

            if let Some(entity) = self.entities.get_mut(&identity) {
                entity.update_target(position, telemetry, now);
                summary.updated += 1;
                let _ = self.event_tx.send(StoreEvent::Updated(identity.clone()));
            } else {
                let entity = Entity::new(
                    identity.clone(),
                    callsign.as_deref(),
                    position,
                    telemetry,
                    now,
                    self.config.limits,
                );
                self.entities.insert(identity.clone(), entity);
                summary.added += 1;
                let _ = self.event_tx.send(StoreEvent::Added(identity.clone()));
            }
            seen.insert(identity);
        }

        summary.evicted = self.evict_unseen(&seen, now);
        self.last_snapshot_at = Some(now);

        debug!(
            "Reconciled snapshot: {} records, {} added, {} updated, {} skipped, {} evicted",
            summary.received, summary.added, summary.updated, summary.skipped, summary.evicted
        );
        summary
    }

    fn evict_unseen(&mut self, seen: &HashSet<String>, now: DateTime<Utc>) -> usize {
        let grace = self.config.grace;
        let policy = self.config.eviction;
        let gap_exceeded = self
            .last_snapshot_at
            .is_some_and(|last| now - last > grace);

        if policy == EvictionPolicy::SnapshotGap && !gap_exceeded {
            return 0;
        }

        let mut removed = Vec::new();
        self.entities.retain(|identity, entity| {
            let expired = match policy {
                EvictionPolicy::SnapshotGap => true,
                EvictionPolicy::LastSeen => now - entity.last_seen() > grace,
            };
            let keep = seen.contains(identity) || !expired;
            if !keep {
                removed.push(identity.clone());
            }
            keep
        });

        if !removed.is_empty() {
            info!("Expired {} aircraft no longer in the feed", removed.len());
        }
        let count = removed.len();
        for identity in removed {
            let _ = self.event_tx.send(StoreEvent::Removed(identity));
        }
        count
    }

    /// Advance interpolation of every tracked aircraft by one step.
    pub fn advance_all(&mut self) {
        for entity in self.entities.values_mut() {
            entity.advance_interpolation();
        }
    }

    /// Tracked aircraft in the order they were first seen.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&Entity> {
        self.entities.get(identity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    #[must_use]
    pub fn last_snapshot_at(&self) -> Option<DateTime<Utc>> {
        self.last_snapshot_at
    }

    /// Subscribe to store events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn asia() -> Bounds {
        Bounds::new(-10.0, 55.0, 60.0, 150.0).unwrap()
    }

    fn record(identity: &str, lat: f64, lon: f64) -> RawRecord {
        RawRecord {
            identity: Some(identity.to_string()),
            label: Some(format!("{identity}1")),
            latitude: Some(lat),
            longitude: Some(lon),
            ..Default::default()
        }
    }

    fn ids(store: &EntityStore) -> Vec<&str> {
        store.iter().map(Entity::identity).collect()
    }

    #[test]
    fn test_reconcile_creates_entities() {
        let mut store = EntityStore::new(asia(), StoreConfig::default());
        let summary = store.reconcile(
            &[record("aaa", 35.68, 139.76), record("bbb", 1.35, 103.99)],
            at(0),
        );

        assert_eq!(summary.added, 2);
        assert_eq!(store.len(), 2);
        let e = store.get("aaa").unwrap();
        assert_eq!(e.target_position(), GeoPoint::new(35.68, 139.76));
        assert_eq!(e.trail().len(), 1);
        assert_eq!(store.last_snapshot_at(), Some(at(0)));
    }

    #[test]
    fn test_unusable_records_are_skipped() {
        let mut store = EntityStore::new(asia(), StoreConfig::default());
        let no_lat = RawRecord {
            identity: Some("nolat".to_string()),
            longitude: Some(100.0),
            ..Default::default()
        };
        let no_identity = RawRecord {
            latitude: Some(20.0),
            longitude: Some(100.0),
            ..Default::default()
        };
        let blank_identity = RawRecord {
            identity: Some("  ".to_string()),
            ..record("x", 20.0, 100.0)
        };
        let records = vec![
            record("first", 10.0, 100.0),
            no_lat,
            record("london", 51.5, -0.12),
            record("nan", f64::NAN, 100.0),
            no_identity,
            blank_identity,
            record("last", 20.0, 110.0),
        ];

        let summary = store.reconcile(&records, at(0));
        assert_eq!(summary.received, 7);
        assert_eq!(summary.skipped, 5);
        assert_eq!(summary.added, 2);
        assert_eq!(ids(&store), vec!["first", "last"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut store = EntityStore::new(asia(), StoreConfig::default());
        store.reconcile(&[record("aaa", 35.0, 139.0)], at(0));
        for _ in 0..10 {
            store.advance_all();
        }

        let snapshot = vec![record("aaa", 35.5, 139.5), record("bbb", 20.0, 100.0)];
        store.reconcile(&snapshot, at(10));
        let before: Vec<(GeoPoint, GeoPoint)> = store
            .iter()
            .map(|e| (e.display_position(), e.target_position()))
            .collect();

        store.reconcile(&snapshot, at(10));
        let after: Vec<(GeoPoint, GeoPoint)> = store
            .iter()
            .map(|e| (e.display_position(), e.target_position()))
            .collect();

        assert_eq!(store.len(), 2);
        assert_eq!(before, after);
    }

    #[test]
    fn test_absent_entities_kept_within_grace() {
        let mut store = EntityStore::new(asia(), StoreConfig::default());
        store.reconcile(&[record("aaa", 35.0, 139.0), record("bbb", 20.0, 100.0)], at(0));

        // Several snapshots 10 s apart without "aaa", including an empty one.
        store.reconcile(&[record("bbb", 20.1, 100.1)], at(10));
        store.reconcile(&[], at(20));
        let summary = store.reconcile(&[record("bbb", 20.2, 100.2)], at(30));

        assert_eq!(summary.evicted, 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_absent_entities_evicted_after_gap() {
        let mut store = EntityStore::new(asia(), StoreConfig::default());
        store.reconcile(&[record("aaa", 35.0, 139.0), record("bbb", 20.0, 100.0)], at(0));

        // Exactly the grace window is not enough.
        let summary = store.reconcile(&[record("bbb", 20.1, 100.1)], at(60));
        assert_eq!(summary.evicted, 0);

        let summary = store.reconcile(&[record("bbb", 20.2, 100.2)], at(121));
        assert_eq!(summary.evicted, 1);
        assert_eq!(ids(&store), vec!["bbb"]);
    }

    #[test]
    fn test_last_seen_policy_ages_individually() {
        let mut store = EntityStore::new(
            asia(),
            StoreConfig {
                eviction: EvictionPolicy::LastSeen,
                ..Default::default()
            },
        );
        store.reconcile(&[record("aaa", 35.0, 139.0)], at(0));
        store.reconcile(&[record("bbb", 20.0, 100.0)], at(30));

        for secs in [40, 50, 60] {
            store.reconcile(&[record("bbb", 20.0, 100.0)], at(secs));
        }
        assert_eq!(store.len(), 2);

        let summary = store.reconcile(&[record("bbb", 20.0, 100.0)], at(61));
        assert_eq!(summary.evicted, 1);
        assert!(store.get("aaa").is_none());
    }

    #[test]
    fn test_insertion_order_survives_eviction() {
        let mut store = EntityStore::new(asia(), StoreConfig::default());
        store.reconcile(
            &[
                record("a", 1.0, 100.0),
                record("b", 2.0, 100.0),
                record("c", 3.0, 100.0),
            ],
            at(0),
        );
        store.reconcile(&[record("c", 3.0, 100.0), record("a", 1.0, 100.0)], at(90));
        store.reconcile(&[record("d", 4.0, 100.0)], at(95));

        assert_eq!(ids(&store), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_telemetry_is_sanitized() {
        let mut store = EntityStore::new(asia(), StoreConfig::default());
        let raw = RawRecord {
            heading_deg: Some(-90.0),
            altitude_m: Some(-30.0),
            speed_mps: Some(f64::INFINITY),
            country: Some("  ".to_string()),
            ..record("aaa", 35.0, 139.0)
        };
        store.reconcile(&[raw], at(0));

        let e = store.get("aaa").unwrap();
        assert_eq!(e.heading(), Some(270.0));
        assert_eq!(e.altitude(), Some(0.0));
        assert_eq!(e.ground_speed(), None);
        assert_eq!(e.telemetry().country, None);
    }

    #[test]
    fn test_heading_wraps_into_range() {
        let mut store = EntityStore::new(asia(), StoreConfig::default());
        let raw = |id: &str, heading: f64| RawRecord {
            heading_deg: Some(heading),
            ..record(id, 35.0, 139.0)
        };
        store.reconcile(&[raw("aaa", -1e-20), raw("bbb", 360.0), raw("ccc", 720.5)], at(0));

        assert_eq!(store.get("aaa").unwrap().heading(), Some(0.0));
        assert_eq!(store.get("bbb").unwrap().heading(), Some(0.0));
        assert_eq!(store.get("ccc").unwrap().heading(), Some(0.5));
    }

    #[test]
    fn test_duplicate_identity_in_snapshot() {
        let mut store = EntityStore::new(asia(), StoreConfig::default());
        let summary = store.reconcile(&[record("aaa", 35.0, 139.0), record("aaa", 35.1, 139.1)], at(0));

        assert_eq!(summary.added, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("aaa").unwrap().target_position(), GeoPoint::new(35.1, 139.1));
    }

    #[test]
    fn test_events_are_published() {
        let mut store = EntityStore::new(asia(), StoreConfig::default());
        let mut rx = store.subscribe();

        store.reconcile(&[record("aaa", 35.0, 139.0)], at(0));
        store.reconcile(&[record("aaa", 35.1, 139.1)], at(10));
        store.reconcile(&[], at(100));

        assert_eq!(rx.try_recv().unwrap(), StoreEvent::Added("aaa".to_string()));
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::Updated("aaa".to_string()));
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::Removed("aaa".to_string()));
        assert!(rx.try_recv().is_err());
    }
}
