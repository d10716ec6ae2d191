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

//! OpenSky Network `/states/all` parser.
//!
//! The response body is a JSON object whose `states` member is an array of
//! positional state vectors:
//!
//! ```text
//! [icao24, callsign, origin_country, time_position, last_contact,
//!  longitude, latitude, baro_altitude, on_ground, velocity,
//!  true_track, vertical_rate, sensors, geo_altitude, squawk, spi, position_source]
//! ```
//!
//! Any of the values may be `null`.

use log::debug;
use serde_json::Value;

use super::{ParseError, RawRecord};

/// Public anonymous endpoint.
pub const DEFAULT_URL: &str = "https://opensky-network.org/api/states/all";

const ICAO24: usize = 0;
const CALLSIGN: usize = 1;
const ORIGIN_COUNTRY: usize = 2;
const LONGITUDE: usize = 5;
const LATITUDE: usize = 6;
const BARO_ALTITUDE: usize = 7;
const ON_GROUND: usize = 8;
const VELOCITY: usize = 9;
const TRUE_TRACK: usize = 10;
const VERTICAL_RATE: usize = 11;

/// Parse a full response body.
///
/// A body that is not a states object is an error; individual state vectors
/// that cannot be read are skipped.
pub fn parse_states(body: &str) -> Result<Vec<RawRecord>, ParseError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ParseError::InvalidFormat(e.to_string()))?;
    parse_states_value(&value)
}

/// Parse an already-decoded response.
pub fn parse_states_value(value: &Value) -> Result<Vec<RawRecord>, ParseError> {
    let object = value
        .as_object()
        .ok_or_else(|| ParseError::InvalidFormat("expected a JSON object".to_string()))?;

    let states = match object.get("states") {
        Some(Value::Array(states)) => states,
        // OpenSky reports an empty sky as `"states": null`.
        Some(Value::Null) => return Ok(Vec::new()),
        Some(other) => {
            return Err(ParseError::InvalidValue {
                field: "states",
                value: other.to_string(),
            })
        }
        None => return Err(ParseError::MissingField("states")),
    };

    let mut records = Vec::with_capacity(states.len());
    let mut rejected = 0usize;
    for state in states {
        match parse_state_vector(state) {
            Ok(record) => records.push(record),
            Err(e) => {
                rejected += 1;
                debug!("Skipping state vector: {}", e);
            }
        }
    }
    if rejected > 0 {
        debug!("Skipped {} of {} state vectors", rejected, states.len());
    }

    Ok(records)
}

/// Parse one positional state vector.
pub fn parse_state_vector(state: &Value) -> Result<RawRecord, ParseError> {
    let fields = state
        .as_array()
        .ok_or_else(|| ParseError::InvalidFormat("state vector is not an array".to_string()))?;

    let identity = match fields.get(ICAO24) {
        Some(Value::String(icao)) => icao.trim().to_string(),
        Some(Value::Null) | None => return Err(ParseError::MissingField("icao24")),
        Some(other) => {
            return Err(ParseError::InvalidValue {
                field: "icao24",
                value: other.to_string(),
            })
        }
    };

    let text = |index: usize| fields.get(index).and_then(Value::as_str).map(str::to_string);
    let number = |index: usize| fields.get(index).and_then(Value::as_f64);

    Ok(RawRecord {
        identity: Some(identity),
        label: text(CALLSIGN),
        longitude: number(LONGITUDE),
        latitude: number(LATITUDE),
        altitude_m: number(BARO_ALTITUDE),
        speed_mps: number(VELOCITY),
        heading_deg: number(TRUE_TRACK),
        vertical_rate_mps: number(VERTICAL_RATE),
        on_ground: fields.get(ON_GROUND).and_then(Value::as_bool),
        country: text(ORIGIN_COUNTRY),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "time": 1700000000,
        "states": [
            ["84c0b1", "JAL006  ", "Japan", 1700000000, 1700000000, 139.76, 35.68, 10972.8, false, 250.5, 45.0, -1.3, null, 11000.0, "1234", false, 0],
            ["7c6b2d", null, "Australia", null, 1700000000, null, null, null, true, 0, null, null, null, null, null, false, 0],
            "garbage",
            [12345, "BAD1", "Nowhere", null, null, 100.0, 10.0],
            [null, "ANON", "Nowhere", null, null, 100.0, 10.0],
            ["a1b2c3", "SIA21", "Singapore", null, null, 103.99, 1.35]
        ]
    }"#;

    #[test]
    fn test_parse_full_body() {
        let records = parse_states(BODY).unwrap();
        assert_eq!(records.len(), 3);

        let jal = &records[0];
        assert_eq!(jal.identity.as_deref(), Some("84c0b1"));
        assert_eq!(jal.label.as_deref(), Some("JAL006  "));
        assert_eq!(jal.country.as_deref(), Some("Japan"));
        assert_eq!(jal.longitude, Some(139.76));
        assert_eq!(jal.latitude, Some(35.68));
        assert_eq!(jal.altitude_m, Some(10972.8));
        assert_eq!(jal.speed_mps, Some(250.5));
        assert_eq!(jal.heading_deg, Some(45.0));
        assert_eq!(jal.vertical_rate_mps, Some(-1.3));
        assert_eq!(jal.on_ground, Some(false));
    }

    #[test]
    fn test_null_fields_become_none() {
        let records = parse_states(BODY).unwrap();
        let grounded = &records[1];
        assert_eq!(grounded.identity.as_deref(), Some("7c6b2d"));
        assert_eq!(grounded.label, None);
        assert_eq!(grounded.latitude, None);
        assert_eq!(grounded.longitude, None);
        assert_eq!(grounded.speed_mps, Some(0.0));
        assert_eq!(grounded.on_ground, Some(true));
    }

    #[test]
    fn test_short_vector_is_accepted() {
        let records = parse_states(BODY).unwrap();
        let sia = &records[2];
        assert_eq!(sia.identity.as_deref(), Some("a1b2c3"));
        assert_eq!(sia.latitude, Some(1.35));
        assert_eq!(sia.altitude_m, None);
        assert_eq!(sia.heading_deg, None);
    }

    #[test]
    fn test_null_states_is_empty_snapshot() {
        let records = parse_states(r#"{"time": 1700000000, "states": null}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_malformed_body_is_error() {
        assert!(matches!(parse_states("<html>"), Err(ParseError::InvalidFormat(_))));
        assert!(matches!(parse_states("[1, 2]"), Err(ParseError::InvalidFormat(_))));
        assert_eq!(
            parse_states(r#"{"time": 1}"#),
            Err(ParseError::MissingField("states"))
        );
        assert!(matches!(
            parse_states(r#"{"states": 3}"#),
            Err(ParseError::InvalidValue { field: "states", .. })
        ));
    }

    #[test]
    fn test_state_vector_errors() {
        assert_eq!(
            parse_state_vector(&serde_json::json!([null, "X"])),
            Err(ParseError::MissingField("icao24"))
        );
        assert!(matches!(
            parse_state_vector(&serde_json::json!({"icao24": "abc"})),
            Err(ParseError::InvalidFormat(_))
        ));
    }
}
