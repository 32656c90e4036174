//! Single-pass aggregation over an uploaded table.

use std::collections::HashMap;

use crate::models::{AggregationResult, EquipmentDistribution};
use crate::table::UploadedTable;

// ---

/// Categorical columns probed for the equipment distribution, highest
/// priority first. The first one present in the table wins.
pub const EQUIPMENT_COLUMNS: [&str; 4] = ["EquipmentClass", "EquipmentType", "Equipment", "Type"];

/// Reduce a table to its summary statistics. Never fails: absent categorical
/// data yields an empty distribution, and a column with no parseable values
/// yields a `NaN` average rather than a fabricated zero.
pub fn aggregate(table: &UploadedTable) -> AggregationResult {
    // ---
    AggregationResult {
        row_count: table.row_count() as i64,
        avg_flowrate: column_mean(table, "Flowrate"),
        avg_pressure: column_mean(table, "Pressure"),
        avg_temperature: column_mean(table, "Temperature"),
        equipment_distribution: equipment_distribution(table),
    }
}

/// Arithmetic mean over the values of `name` that parse as numbers. `NaN`
/// when the column is absent or has no parseable values.
fn column_mean(table: &UploadedTable, name: &str) -> f64 {
    // ---
    let Some(values) = table.column(name) else {
        return f64::NAN;
    };

    let mut sum = 0.0;
    let mut count = 0u64;
    for value in values {
        if let Ok(number) = value.trim().parse::<f64>() {
            sum += number;
            count += 1;
        }
    }

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Count rows per distinct value of the first matching equipment column.
/// Empty cells carry no label and are not counted.
fn equipment_distribution(table: &UploadedTable) -> EquipmentDistribution {
    // ---
    let Some(column) = EQUIPMENT_COLUMNS
        .iter()
        .copied()
        .find(|name| table.has_column(name))
    else {
        return EquipmentDistribution::default();
    };

    let Some(values) = table.column(column) else {
        return EquipmentDistribution::default();
    };

    // first-seen order feeds the stable sort's tie-break
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u64> = HashMap::new();
    for value in values {
        if value.is_empty() {
            continue;
        }
        let count = counts.entry(value.to_string()).or_insert(0);
        if *count == 0 {
            order.push(value.to_string());
        }
        *count += 1;
    }

    let pairs = order
        .into_iter()
        .filter_map(|label| counts.remove(&label).map(|count| (label, count)))
        .collect();

    EquipmentDistribution::from_counts(pairs)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::round2;
    use crate::table::parse;

    fn table_from(raw: &str) -> UploadedTable {
        parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn computes_counts_and_means() {
        // ---
        let table = table_from(
            "Flowrate,Pressure,Temperature,Equipment\n\
             10,100,25,Pump\n\
             20,200,30,Valve\n\
             15,150,28,Pump\n",
        );

        let result = aggregate(&table);
        assert_eq!(result.row_count, 3);
        assert_eq!(result.avg_flowrate, 15.0);
        assert_eq!(result.avg_pressure, 150.0);
        assert_eq!(round2(result.avg_temperature), 27.67);
        assert_eq!(
            result.equipment_distribution.pairs(),
            [("Pump".to_string(), 2), ("Valve".to_string(), 1)]
        );
    }

    #[test]
    fn distribution_counts_sum_to_row_count() {
        // ---
        let table = table_from(
            "Flowrate,Pressure,Temperature,Type\n\
             1,1,1,A\n\
             2,2,2,B\n\
             3,3,3,A\n\
             4,4,4,C\n",
        );

        let result = aggregate(&table);
        let total: u64 = result
            .equipment_distribution
            .pairs()
            .iter()
            .map(|(_, count)| count)
            .sum();
        assert_eq!(total as i64, result.row_count);
    }

    #[test]
    fn zero_rows_yield_nan_means() {
        // ---
        let table = table_from("Flowrate,Pressure,Temperature\n");

        let result = aggregate(&table);
        assert_eq!(result.row_count, 0);
        assert!(result.avg_flowrate.is_nan());
        assert!(result.avg_pressure.is_nan());
        assert!(result.avg_temperature.is_nan());
    }

    #[test]
    fn unparseable_values_are_skipped() {
        // ---
        let table = table_from(
            "Flowrate,Pressure,Temperature\n\
             10,abc,25\n\
             20,,30\n",
        );

        let result = aggregate(&table);
        assert_eq!(result.avg_flowrate, 15.0);
        assert!(result.avg_pressure.is_nan());
        assert_eq!(result.avg_temperature, 27.5);
    }

    #[test]
    fn equipment_column_priority_order() {
        // ---
        let table = table_from(
            "Flowrate,Pressure,Temperature,Type,EquipmentType\n\
             1,1,1,ignored,Pump\n",
        );

        let result = aggregate(&table);
        assert_eq!(
            result.equipment_distribution.pairs(),
            [("Pump".to_string(), 1)]
        );
    }

    #[test]
    fn missing_equipment_column_yields_empty_distribution() {
        // ---
        let table = table_from("Flowrate,Pressure,Temperature\n1,2,3\n");

        let result = aggregate(&table);
        assert!(result.equipment_distribution.pairs().is_empty());
    }

    #[test]
    fn empty_equipment_cells_are_not_counted() {
        // ---
        let table = table_from(
            "Flowrate,Pressure,Temperature,Equipment\n\
             1,1,1,Pump\n\
             2,2,2,\n",
        );

        let result = aggregate(&table);
        assert_eq!(
            result.equipment_distribution.pairs(),
            [("Pump".to_string(), 1)]
        );
    }

    #[test]
    fn equal_counts_keep_first_seen_order() {
        // ---
        let table = table_from(
            "Flowrate,Pressure,Temperature,Equipment\n\
             1,1,1,Valve\n\
             2,2,2,Pump\n\
             3,3,3,Valve\n\
             4,4,4,Pump\n",
        );

        let result = aggregate(&table);
        assert_eq!(
            result.equipment_distribution.pairs(),
            [("Valve".to_string(), 2), ("Pump".to_string(), 2)]
        );
    }
}
