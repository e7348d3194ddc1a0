//! # Sensor Reply Parsing
//!
//! The device answers the `sensors` command with one line per reading, for
//! example `Result: Temperature: 24.00C`. Lines carrying the `Result: `
//! marker are turned into `key -> value` pairs; everything else is noise.
//! Result lines without a `label: value` structure are alarm messages and
//! are classified by keyword (see [`STATUS_RULES`]).

use crate::constants::{LABEL_SEPARATOR, RESULT_MARKER};
use crate::link::exchange::ReplyBatch;
use serde::Serialize;
use std::collections::BTreeMap;

/// Normalized sensor name to raw value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct SensorReading(BTreeMap<String, String>);

impl SensorReading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Inserts or overwrites.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SensorReading {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        SensorReading(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Keyword rule for free-text status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRule {
    /// Lower-case substring to look for
    pub needle: &'static str,
    /// Key the whole status text is stored under
    pub key: &'static str,
}

/// Checked in order; the first match wins. Status lines matching none of
/// these are dropped.
pub const STATUS_RULES: &[StatusRule] = &[
    StatusRule {
        needle: "fire",
        key: "fire_safety",
    },
    StatusRule {
        needle: "noise",
        key: "noise_status",
    },
    StatusRule {
        needle: "intruder",
        key: "motion_status",
    },
];

/// Parses the reply to the `sensors` command.
pub fn parse_sensors(batch: &ReplyBatch) -> SensorReading {
    parse_sensor_lines(batch.lines())
}

/// Parses any sequence of reply lines. Later keys overwrite earlier ones.
pub fn parse_sensor_lines<S: AsRef<str>>(lines: &[S]) -> SensorReading {
    let mut reading = SensorReading::new();
    for line in lines {
        let Some(body) = result_body(line.as_ref()) else {
            continue;
        };
        if let Some((key, value)) = parse_result_body(body) {
            reading.insert(key, value);
        }
    }
    reading
}

/// Text after the first `Result: ` marker, if the line has one.
pub fn result_body(line: &str) -> Option<&str> {
    line.split_once(RESULT_MARKER).map(|(_, body)| body)
}

/// Turns a result body into a key/value pair.
///
/// `Temperature: 24.00C` gives `("temperature", "24.00C")`. A body without
/// a `": "` separator is matched against [`STATUS_RULES`] and stored whole.
pub fn parse_result_body(body: &str) -> Option<(String, String)> {
    match body.split_once(LABEL_SEPARATOR) {
        Some((label, value)) => Some((normalize_key(label), value.trim().to_string())),
        None => classify_status(body).map(|key| (key.to_string(), body.to_string())),
    }
}

/// `" Air Quality "` -> `"air_quality"`
pub fn normalize_key(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

/// Key for a free-text status line, case-insensitive.
pub fn classify_status(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    STATUS_RULES
        .iter()
        .find(|rule| lowered.contains(rule.needle))
        .map(|rule| rule.key)
}
