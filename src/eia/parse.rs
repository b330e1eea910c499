//! Record parsing for region-data responses
//!
//! Upstream records are not consistently named across API revisions, so every
//! lookup tries a list of aliases before giving up.

use crate::error::{GridwatchError, Result};
use crate::model::{RegionId, RegionSnapshot};
use serde_json::Value;
use std::collections::BTreeMap;

const RESPONDENT_KEYS: &[&str] = &["respondent", "respondent-id", "ba"];
const TYPE_CODE_KEYS: &[&str] = &["type", "type-code"];
const TYPE_NAME_KEYS: &[&str] = &["type-name", "typeName", "type_name"];
const VALUE_KEYS: &[&str] = &["value", "Value"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Demand,
    Generation,
    Interchange,
}

/// Map a type code and/or type name to a metric.
///
/// Known codes (`D`, `NG`, `TI`) take precedence. Otherwise the name is
/// searched for keywords; forecast series are never classified.
pub fn classify_metric(code: Option<&str>, name: Option<&str>) -> Option<MetricKind> {
    match code.map(str::trim) {
        Some(c) if c.eq_ignore_ascii_case("D") => return Some(MetricKind::Demand),
        Some(c) if c.eq_ignore_ascii_case("NG") => return Some(MetricKind::Generation),
        Some(c) if c.eq_ignore_ascii_case("TI") => return Some(MetricKind::Interchange),
        _ => {}
    }
    let name = name?.to_ascii_lowercase();
    if name.contains("forecast") {
        None
    } else if name.contains("demand") || name.contains("load") {
        Some(MetricKind::Demand)
    } else if name.contains("generation") {
        Some(MetricKind::Generation)
    } else if name.contains("interchange") {
        Some(MetricKind::Interchange)
    } else {
        None
    }
}

/// Coerce a JSON number or numeric string into a finite `f64`
pub fn coerce_value(value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(GridwatchError::parse(format!(
            "value is not a finite number: {}",
            value
        ))),
    }
}

fn first_str<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| record.get(*k).and_then(Value::as_str))
}

fn first_value<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| record.get(*k))
}

#[derive(Default)]
struct MaxAccumulator {
    demand: Option<f64>,
    generation: Option<f64>,
    interchange: Option<f64>,
}

impl MaxAccumulator {
    fn observe(&mut self, kind: MetricKind, value: f64) {
        let slot = match kind {
            MetricKind::Demand => &mut self.demand,
            MetricKind::Generation => &mut self.generation,
            MetricKind::Interchange => &mut self.interchange,
        };
        *slot = Some(slot.map_or(value, |cur| cur.max(value)));
    }

    fn finish(self) -> RegionSnapshot {
        RegionSnapshot {
            demand: self.demand.unwrap_or(0.0),
            generation: self.generation.unwrap_or(0.0),
            interchange: self.interchange.unwrap_or(0.0),
        }
    }
}

/// Result of merging raw records into per-region readings
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub per_region: BTreeMap<RegionId, RegionSnapshot>,
    /// Records whose value could not be coerced and counted as zero
    pub unparsed_values: usize,
}

/// Merge raw records into one snapshot per tracked region.
///
/// The largest value observed per region and metric wins, regardless of
/// record order. Records for untracked respondents or unknown metrics are
/// skipped; tracked regions with no records report zeros.
pub fn merge_region_records(regions: &[RegionId], records: &[Value]) -> MergeOutcome {
    let mut accumulators: BTreeMap<RegionId, MaxAccumulator> = regions
        .iter()
        .map(|r| (r.clone(), MaxAccumulator::default()))
        .collect();
    let mut unparsed_values = 0usize;

    for record in records {
        let Some(respondent) = first_str(record, RESPONDENT_KEYS) else {
            continue;
        };
        let Some((_, acc)) = accumulators
            .iter_mut()
            .find(|(id, _)| id.matches(respondent))
        else {
            continue;
        };
        let Some(kind) = classify_metric(
            first_str(record, TYPE_CODE_KEYS),
            first_str(record, TYPE_NAME_KEYS),
        ) else {
            continue;
        };
        let value = match first_value(record, VALUE_KEYS).map(coerce_value) {
            Some(Ok(v)) => v,
            _ => {
                unparsed_values += 1;
                0.0
            }
        };
        acc.observe(kind, value);
    }

    MergeOutcome {
        per_region: accumulators
            .into_iter()
            .map(|(id, acc)| (id, acc.finish()))
            .collect(),
        unparsed_values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn regions() -> Vec<RegionId> {
        vec![RegionId::new("AZPS"), RegionId::new("SRP")]
    }

    #[test]
    fn classifies_codes_and_names() {
        assert_eq!(classify_metric(Some("D"), None), Some(MetricKind::Demand));
        assert_eq!(
            classify_metric(Some("NG"), Some("whatever")),
            Some(MetricKind::Generation)
        );
        assert_eq!(
            classify_metric(None, Some("Total interchange")),
            Some(MetricKind::Interchange)
        );
        assert_eq!(
            classify_metric(Some("X"), Some("System Load")),
            Some(MetricKind::Demand)
        );
        assert_eq!(
            classify_metric(Some("DF"), Some("Day-ahead demand forecast")),
            None
        );
        assert_eq!(classify_metric(None, None), None);
    }

    #[test]
    fn coerces_numbers_and_strings() {
        assert_eq!(coerce_value(&json!(42)).unwrap(), 42.0);
        assert_eq!(coerce_value(&json!(" 12.5 ")).unwrap(), 12.5);
        assert!(coerce_value(&json!("n/a")).is_err());
        assert!(coerce_value(&json!(null)).is_err());
        assert!(coerce_value(&json!("NaN")).is_err());
    }

    #[test]
    fn max_value_wins_regardless_of_order() {
        let records = vec![
            json!({"respondent": "AZPS", "type": "D", "value": 500}),
            json!({"respondent": "AZPS", "type": "D", "value": 650}),
            json!({"respondent": "AZPS", "type": "D", "value": 600}),
        ];
        let out = merge_region_records(&regions(), &records);
        assert_eq!(out.per_region[&RegionId::new("AZPS")].demand, 650.0);
    }

    #[test]
    fn negative_interchange_is_preserved() {
        let records = vec![
            json!({"respondent": "SRP", "type": "TI", "value": -320}),
            json!({"respondent": "SRP", "type": "TI", "value": -410}),
        ];
        let out = merge_region_records(&regions(), &records);
        assert_eq!(out.per_region[&RegionId::new("SRP")].interchange, -320.0);
    }

    #[test]
    fn alias_keys_are_accepted() {
        let records = vec![
            json!({"respondent-id": "azps", "type-code": "NG", "Value": "4100"}),
            json!({"ba": "SRP", "typeName": "Net generation", "value": 3900.5}),
            json!({"ba": "SRP", "type_name": "Demand", "value": 3800}),
        ];
        let out = merge_region_records(&regions(), &records);
        assert_eq!(out.per_region[&RegionId::new("AZPS")].generation, 4100.0);
        assert_eq!(out.per_region[&RegionId::new("SRP")].generation, 3900.5);
        assert_eq!(out.per_region[&RegionId::new("SRP")].demand, 3800.0);
    }

    #[test]
    fn unparsable_values_count_as_zero() {
        let records = vec![json!({"respondent": "AZPS", "type": "D", "value": "bad"})];
        let out = merge_region_records(&regions(), &records);
        assert_eq!(out.unparsed_values, 1);
        assert_eq!(out.per_region[&RegionId::new("AZPS")].demand, 0.0);
    }

    #[test]
    fn regions_without_records_report_zero() {
        let records = vec![json!({"respondent": "WALC", "type": "D", "value": 900})];
        let out = merge_region_records(&regions(), &records);
        assert_eq!(out.per_region.len(), 2);
        assert_eq!(out.per_region[&RegionId::new("SRP")], RegionSnapshot::default());
    }
}
