//! Core types for the impulse scoring pipeline
//!
//! This module defines the data structures that flow through the engine:
//! the impulse state snapshot, the intervention level classifier, history
//! samples with trigger annotations, and the discrete interaction events
//! fed in by the shopping UI.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discrete intervention level derived from the impulse score.
///
/// Levels are ordered by severity; comparisons like
/// `level >= InterventionLevel::Breathing` follow declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionLevel {
    /// L0 - no gating, engine updates freely
    Normal,
    /// L1 - transient reflection notice
    Reflection,
    /// L2 - visual degradation hint
    Grayscale,
    /// L3 - blocking breathing routine
    Breathing,
    /// L4 - typed confirmation lock
    MicroLock,
    /// L5 - full safe-mode lock
    SafeMode,
}

impl InterventionLevel {
    /// Classify a raw score into an intervention level.
    ///
    /// Total over all floats: out-of-range inputs fall into the outer
    /// buckets rather than erroring. Boundaries are closed on the lower
    /// edge and the six ranges partition [0, 1] with no gaps or overlaps.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            InterventionLevel::SafeMode
        } else if score >= 0.70 {
            InterventionLevel::MicroLock
        } else if score >= 0.60 {
            InterventionLevel::Breathing
        } else if score >= 0.40 {
            InterventionLevel::Grayscale
        } else if score >= 0.20 {
            InterventionLevel::Reflection
        } else {
            InterventionLevel::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionLevel::Normal => "normal",
            InterventionLevel::Reflection => "reflection",
            InterventionLevel::Grayscale => "grayscale",
            InterventionLevel::Breathing => "breathing",
            InterventionLevel::MicroLock => "micro_lock",
            InterventionLevel::SafeMode => "safe_mode",
        }
    }
}

/// Snapshot of the current impulse state.
///
/// Owned exclusively by the engine; consumers only ever read copies.
/// After any mutation `level == InterventionLevel::from_score(score)` holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpulseState {
    /// Continuously varying impulse intensity (0-1)
    pub score: f64,
    /// Discrete classification of `score`
    pub level: InterventionLevel,
    /// True while the shopping view is active
    pub is_shopping: bool,
    /// Set once per session based on time-of-day (22:00-04:59)
    pub session_high_risk: bool,
}

/// Product context consumed by trigger reasons.
///
/// The catalog UI owns full product records; the core only reads the
/// fields that appear in trigger annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: u64,
    pub title: String,
    pub brand: String,
}

/// Trigger annotation attached to a history sample on a level escalation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerInfo {
    /// The new (higher) level that was reached
    pub level: InterventionLevel,
    /// Last-viewed product title, or "Browsing" when none
    pub product_context: String,
    /// Human-readable explanation, selected by level
    pub reason: String,
    /// Sample time formatted HH:MM
    pub display_time: String,
}

/// One point on the excitement curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    /// Sample time, serialized as ms-epoch for charting
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Score rescaled to 0-10 for display
    pub excitement: f64,
    /// Present when this sample coincided with a level escalation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerInfo>,
}

/// Escalation event logged for analytics. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: InterventionLevel,
}

/// Kinds of discrete interaction events the catalog UI reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    ProductView,
    Scroll,
    Click,
    AddToCart,
}

/// A discrete interaction event, as replayed by the CLI or an embedding app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Event kind
    pub kind: InteractionKind,
    /// Product context (present for product_view, optional elsewhere)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductRef>,
}

impl InteractionEvent {
    /// Parse newline-delimited JSON, one event per line. Blank lines are
    /// skipped.
    pub fn parse_ndjson(data: &str) -> Result<Vec<InteractionEvent>, EngineError> {
        let mut events = Vec::new();
        for (index, line) in data.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let event: InteractionEvent = serde_json::from_str(trimmed).map_err(|e| {
                EngineError::ParseError(format!("line {}: {}", index + 1, e))
            })?;
            events.push(event);
        }
        Ok(events)
    }

    /// Parse a JSON array of events.
    pub fn parse_array(data: &str) -> Result<Vec<InteractionEvent>, EngineError> {
        Ok(serde_json::from_str(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_partitions_unit_interval() {
        // Boundary table: closed lower edges, no gaps or overlaps.
        let cases = [
            (0.0, InterventionLevel::Normal),
            (0.199_999, InterventionLevel::Normal),
            (0.2, InterventionLevel::Reflection),
            (0.399_999, InterventionLevel::Reflection),
            (0.4, InterventionLevel::Grayscale),
            (0.599_999, InterventionLevel::Grayscale),
            (0.6, InterventionLevel::Breathing),
            (0.699_999, InterventionLevel::Breathing),
            (0.7, InterventionLevel::MicroLock),
            (0.849_999, InterventionLevel::MicroLock),
            (0.85, InterventionLevel::SafeMode),
            (1.0, InterventionLevel::SafeMode),
        ];
        for (score, expected) in cases {
            assert_eq!(InterventionLevel::from_score(score), expected, "score {score}");
        }
    }

    #[test]
    fn classifier_is_stateless_and_single_valued() {
        // Reclassifying the same score in any order gives the same level.
        let mut step = 0.0;
        while step <= 1.0 {
            let first = InterventionLevel::from_score(step);
            let second = InterventionLevel::from_score(step);
            assert_eq!(first, second);
            step += 0.01;
        }
    }

    #[test]
    fn classifier_is_total_over_out_of_range_inputs() {
        assert_eq!(InterventionLevel::from_score(-5.0), InterventionLevel::Normal);
        assert_eq!(InterventionLevel::from_score(42.0), InterventionLevel::SafeMode);
        assert_eq!(InterventionLevel::from_score(f64::NAN), InterventionLevel::Normal);
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(InterventionLevel::Normal < InterventionLevel::Reflection);
        assert!(InterventionLevel::Breathing < InterventionLevel::MicroLock);
        assert!(InterventionLevel::MicroLock < InterventionLevel::SafeMode);
    }

    #[test]
    fn level_serializes_snake_case() {
        let json = serde_json::to_string(&InterventionLevel::MicroLock).unwrap();
        assert_eq!(json, "\"micro_lock\"");
        let parsed: InterventionLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, InterventionLevel::MicroLock);
    }

    #[test]
    fn history_sample_timestamp_is_ms_epoch() {
        use chrono::TimeZone;
        let sample = HistorySample {
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            excitement: 3.5,
            trigger: None,
        };
        let value: serde_json::Value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["timestamp"], 1_700_000_000_123_i64);
        assert!(value.get("trigger").is_none());
    }

    #[test]
    fn interaction_event_deserializes() {
        let json = r#"{
            "timestamp": "2024-01-15T14:05:00Z",
            "kind": "add_to_cart",
            "product": { "id": 7, "title": "Air Force 1", "brand": "Nike" }
        }"#;
        let event: InteractionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, InteractionKind::AddToCart);
        assert_eq!(event.product.unwrap().brand, "Nike");
    }

    #[test]
    fn ndjson_stream_skips_blank_lines() {
        let data = "\n{\"timestamp\":\"2024-01-15T14:05:00Z\",\"kind\":\"scroll\"}\n\n\
                    {\"timestamp\":\"2024-01-15T14:05:01Z\",\"kind\":\"click\"}\n";
        let events = InteractionEvent::parse_ndjson(data).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, InteractionKind::Scroll);
        assert_eq!(events[1].kind, InteractionKind::Click);
    }

    #[test]
    fn ndjson_parse_errors_name_the_line() {
        let data = "{\"timestamp\":\"2024-01-15T14:05:00Z\",\"kind\":\"scroll\"}\nnot json\n";
        let err = InteractionEvent::parse_ndjson(data).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }
}
