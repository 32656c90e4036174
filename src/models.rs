//! Core data types for the upload/aggregation pipeline.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

// ---

/// Round a value to two decimals for display. `NaN` passes through untouched
/// so an empty upload never masquerades as an average of zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Frequency distribution over the categorical equipment column, ordered by
/// descending count. Ties keep first-appearance order from the source data.
///
/// Serializes as a JSON object whose keys follow that ordering, which is what
/// the dashboard's pie chart consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquipmentDistribution(Vec<(String, u64)>);

impl EquipmentDistribution {
    /// Build a distribution from label/count pairs listed in first-seen
    /// order. The sort is stable, so equal counts retain that order.
    pub fn from_counts(mut pairs: Vec<(String, u64)>) -> Self {
        pairs.sort_by(|a, b| b.1.cmp(&a.1));
        Self(pairs)
    }

    pub fn pairs(&self) -> &[(String, u64)] {
        &self.0
    }
}

impl Serialize for EquipmentDistribution {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in &self.0 {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Summary statistics computed from one uploaded table. Immutable once
/// produced; averages are full precision (possibly `NaN`), rounding happens
/// at the response boundary.
#[derive(Debug, Clone)]
pub struct AggregationResult {
    // ---
    pub row_count: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub equipment_distribution: EquipmentDistribution,
}

/// One persisted upload summary. The distribution is deliberately not part
/// of this record; it only exists in the immediate upload response.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HistoryRecord {
    // ---
    pub id: i64,
    pub uploaded_at: DateTime<Utc>,
    pub total_equipment: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
}

/// JSON body returned by a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    // ---
    pub message: &'static str,
    pub total_equipment: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub equipment_distribution: EquipmentDistribution,
}

impl UploadResponse {
    pub fn new(result: AggregationResult) -> Self {
        // ---
        Self {
            message: "File processed successfully",
            total_equipment: result.row_count,
            avg_flowrate: round2(result.avg_flowrate),
            avg_pressure: round2(result.avg_pressure),
            avg_temperature: round2(result.avg_temperature),
            equipment_distribution: result.equipment_distribution,
        }
    }
}

/// One element of the history endpoint's JSON array. Internal row ids stay
/// internal; averages are rounded for display.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    // ---
    pub uploaded_at: DateTime<Utc>,
    pub total_equipment: i64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
}

impl From<HistoryRecord> for HistoryEntry {
    fn from(record: HistoryRecord) -> Self {
        // ---
        Self {
            uploaded_at: record.uploaded_at,
            total_equipment: record.total_equipment,
            avg_flowrate: round2(record.avg_flowrate),
            avg_pressure: round2(record.avg_pressure),
            avg_temperature: round2(record.avg_temperature),
        }
    }
}

/// JSON body for every failure path.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round2_rounds_to_two_decimals() {
        // ---
        assert_eq!(round2(27.666_666_666), 27.67);
        assert_eq!(round2(15.0), 15.0);
    }

    #[test]
    fn round2_keeps_nan() {
        // ---
        assert!(round2(f64::NAN).is_nan());
    }

    #[test]
    fn distribution_sorts_by_descending_count() {
        // ---
        let dist = EquipmentDistribution::from_counts(vec![
            ("Valve".to_string(), 1),
            ("Pump".to_string(), 3),
            ("Mixer".to_string(), 2),
        ]);

        let labels: Vec<&str> = dist.pairs().iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["Pump", "Mixer", "Valve"]);
    }

    #[test]
    fn distribution_ties_keep_first_seen_order() {
        // ---
        let dist = EquipmentDistribution::from_counts(vec![
            ("Reactor".to_string(), 2),
            ("Condenser".to_string(), 2),
            ("Pump".to_string(), 2),
        ]);

        let labels: Vec<&str> = dist.pairs().iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["Reactor", "Condenser", "Pump"]);
    }

    #[test]
    fn distribution_serializes_in_count_order() {
        // ---
        let dist = EquipmentDistribution::from_counts(vec![
            ("Valve".to_string(), 1),
            ("Pump".to_string(), 2),
        ]);

        let json = serde_json::to_string(&dist).unwrap();
        assert_eq!(json, r#"{"Pump":2,"Valve":1}"#);
    }

    #[test]
    fn history_entry_rounds_for_display() {
        // ---
        let record = HistoryRecord {
            id: 1,
            uploaded_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            total_equipment: 3,
            avg_flowrate: 15.004,
            avg_pressure: 150.0,
            avg_temperature: 27.666_666,
        };

        let entry = HistoryEntry::from(record);
        assert_eq!(entry.avg_flowrate, 15.0);
        assert_eq!(entry.avg_pressure, 150.0);
        assert_eq!(entry.avg_temperature, 27.67);
        assert_eq!(entry.total_equipment, 3);
    }
}
