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

//! Feed layer: the snapshot contract consumed by the tracker.
//!
//! A [`Feed`] hands back a whole batch of [`RawRecord`]s per call. Every field
//! of a record is optional; validation happens in the tracker. The feed is
//! rate-limited upstream, so calls go through [`RateLimitedFeed`], which only
//! forwards a request once the update interval has elapsed since the previous
//! request, successful or not. A source that fetches in the background answers
//! [`FeedError::NotReady`] while its request is in flight; that neither counts
//! as a request nor as a failure.

pub mod opensky;

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, trace, warn};
use thiserror::Error;

/// Seconds between feed requests.
pub const DEFAULT_UPDATE_INTERVAL_SECS: i64 = 10;

/// Errors that can occur while parsing a feed payload.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid snapshot format: {0}")]
    InvalidFormat(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for field '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Errors from a single snapshot request. All of them are transient from
/// the tracker's point of view.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A background request is still in flight.
    #[error("snapshot not ready yet")]
    NotReady,

    #[error("feed worker has shut down")]
    Closed,
}

/// One position report as delivered by the feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// Stable aircraft key (ICAO 24-bit address for OpenSky).
    pub identity: Option<String>,
    /// Callsign.
    pub label: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub speed_mps: Option<f64>,
    pub heading_deg: Option<f64>,
    pub vertical_rate_mps: Option<f64>,
    pub on_ground: Option<bool>,
    pub country: Option<String>,
}

/// Source of position snapshots.
pub trait Feed {
    /// Fetch the current snapshot.
    fn fetch_snapshot(&mut self) -> Result<Vec<RawRecord>, FeedError>;
}

/// Outcome of [`RateLimitedFeed::poll`].
#[derive(Debug)]
pub enum FeedPoll<'a> {
    /// The update interval has not elapsed; nothing was requested.
    Throttled,
    /// A background request is still in flight.
    Pending,
    /// A new snapshot, to be reconciled.
    Fresh(&'a [RawRecord]),
    /// The request failed; the previous snapshot is retained.
    Failed(FeedError),
}

/// Request bookkeeping for status display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedHealth {
    pub last_request: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub cached_records: usize,
}

/// Timestamp-gated wrapper that enforces a floor on the request rate and
/// keeps the last good snapshot.
#[derive(Debug)]
pub struct RateLimitedFeed<F> {
    inner: F,
    interval: TimeDelta,
    last_request: Option<DateTime<Utc>>,
    last_success: Option<DateTime<Utc>>,
    cached: Vec<RawRecord>,
    consecutive_failures: u32,
    total_failures: u64,
}

impl<F: Feed> RateLimitedFeed<F> {
    #[must_use]
    pub fn new(inner: F, interval: TimeDelta) -> Self {
        Self {
            inner,
            interval,
            last_request: None,
            last_success: None,
            cached: Vec::new(),
            consecutive_failures: 0,
            total_failures: 0,
        }
    }

    /// Whether a request would be forwarded at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_request {
            Some(last) => now - last >= self.interval,
            None => true,
        }
    }

    /// Request a snapshot if the interval has elapsed. The request time is
    /// recorded whatever the outcome, so a failing feed is retried no faster
    /// than a healthy one.
    pub fn poll(&mut self, now: DateTime<Utc>) -> FeedPoll<'_> {
        if !self.is_due(now) {
            return FeedPoll::Throttled;
        }
        let previous = self.last_request.replace(now);

        match self.inner.fetch_snapshot() {
            Ok(records) => {
                debug!("Fetched {} records from feed", records.len());
                self.cached = records;
                self.last_success = Some(now);
                self.consecutive_failures = 0;
                FeedPoll::Fresh(&self.cached)
            }
            Err(FeedError::NotReady) => {
                trace!("Feed snapshot still in flight");
                self.last_request = previous;
                FeedPoll::Pending
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.total_failures = self.total_failures.saturating_add(1);
                warn!(
                    "Feed request failed ({} in a row), keeping previous state: {}",
                    self.consecutive_failures, e
                );
                FeedPoll::Failed(e)
            }
        }
    }

    /// The last successfully fetched snapshot.
    #[must_use]
    pub fn cached(&self) -> &[RawRecord] {
        &self.cached
    }

    #[must_use]
    pub fn health(&self) -> FeedHealth {
        FeedHealth {
            last_request: self.last_request,
            last_success: self.last_success,
            consecutive_failures: self.consecutive_failures,
            total_failures: self.total_failures,
            cached_records: self.cached.len(),
        }
    }

    #[must_use]
    pub fn interval(&self) -> TimeDelta {
        self.interval
    }

    #[must_use]
    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut F {
        &mut self.inner
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use super::{Feed, FeedError, RawRecord};

    /// In-memory feed returning scripted results, then empty snapshots.
    #[derive(Debug, Default)]
    pub struct ScriptedFeed {
        pub responses: VecDeque<Result<Vec<RawRecord>, FeedError>>,
        pub calls: usize,
    }

    impl ScriptedFeed {
        pub fn new(responses: Vec<Result<Vec<RawRecord>, FeedError>>) -> Self {
            Self {
                responses: responses.into(),
                calls: 0,
            }
        }
    }

    impl Feed for ScriptedFeed {
        fn fetch_snapshot(&mut self) -> Result<Vec<RawRecord>, FeedError> {
            self.calls += 1;
            self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }
}
