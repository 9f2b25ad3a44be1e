//! Core data types for truck weigh-in sessions
//!
//! - `TruckEntry`: one recorded session, serialized with the remote table's
//!   column names (`truck_id`, `start_time`, ...)
//! - `FormData`: what the user typed, parsed only when the session stops

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label stored when the truck ID field is left blank
pub const UNKNOWN_TRUCK_ID: &str = "Unknown";

/// A single recorded weigh-in session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TruckEntry {
    /// Client-generated unique identifier (UUID v4)
    pub id: String,
    /// Free-text truck label
    pub truck_id: String,
    /// Weight in tons
    pub weight: f64,
    /// Free-text notes, may be empty
    #[serde(default)]
    pub comments: String,
    /// When the session started
    pub start_time: DateTime<Utc>,
    /// When the session stopped; absent while a session is open
    #[serde(default)]
    pub stop_time: Option<DateTime<Utc>>,
}

impl TruckEntry {
    /// Build a completed entry from the form at stop time.
    ///
    /// Blank truck IDs become [`UNKNOWN_TRUCK_ID`] and the weight goes
    /// through [`parse_weight`]. A fresh id is generated on every call.
    pub fn from_form(form: &FormData, start_time: DateTime<Utc>, stop_time: DateTime<Utc>) -> Self {
        let truck_id = if form.truck_id.is_empty() {
            UNKNOWN_TRUCK_ID.to_string()
        } else {
            form.truck_id.clone()
        };

        Self {
            id: Uuid::new_v4().to_string(),
            truck_id,
            weight: parse_weight(&form.weight),
            comments: form.comments.clone(),
            start_time,
            stop_time: Some(stop_time),
        }
    }

    /// Session length, if the entry has been stopped
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.stop_time.map(|stop| stop - self.start_time)
    }
}

/// Parse the weight field.
///
/// Anything that is not a finite number (including the empty string) is
/// recorded as zero.
pub fn parse_weight(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite())
        .unwrap_or(0.0)
}

/// Transient form input, never persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub truck_id: String,
    /// Raw text; parsed at submit time
    pub weight: String,
    pub comments: String,
}

/// The editable form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    TruckId,
    Weight,
    Comments,
}

impl FormData {
    /// Replace one field's value
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::TruckId => self.truck_id = value,
            FormField::Weight => self.weight = value,
            FormField::Comments => self.comments = value,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.truck_id.is_empty() && self.weight.is_empty() && self.comments.is_empty()
    }
}

impl std::str::FromStr for FormField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "truck" | "truck_id" | "truckid" => Ok(FormField::TruckId),
            "weight" => Ok(FormField::Weight),
            "comments" | "comment" => Ok(FormField::Comments),
            other => Err(format!("Unknown form field: {}", other)),
        }
    }
}
