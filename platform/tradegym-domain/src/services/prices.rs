use crate::value_objects::price_point::PricePoint;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub rows: usize,
    pub kept: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub invalid_close: usize,
    pub missing_close: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub first_duplicate: Option<i64>,
    pub first_out_of_order: Option<i64>,
    pub first_invalid_close: Option<i64>,
}

/// Sorts raw rows by timestamp, drops missing/invalid closes and keeps the last
/// row for duplicated timestamps. `None` closes count as missing.
pub fn canonicalize_closes(rows: &[(i64, Option<f64>)]) -> (Vec<PricePoint>, DataQualityReport) {
    let mut report = DataQualityReport {
        rows: rows.len(),
        ..DataQualityReport::default()
    };
    let mut by_ts: BTreeMap<i64, f64> = BTreeMap::new();
    let mut last_seen: Option<i64> = None;

    for &(timestamp, close) in rows {
        let Some(close) = close else {
            report.missing_close += 1;
            continue;
        };
        if !close.is_finite() || close < 0.0 {
            report.invalid_close += 1;
            if report.first_invalid_close.is_none() {
                report.first_invalid_close = Some(timestamp);
            }
            continue;
        }

        if let Some(prev) = last_seen {
            if timestamp < prev {
                report.out_of_order += 1;
                if report.first_out_of_order.is_none() {
                    report.first_out_of_order = Some(timestamp);
                }
            }
        }
        last_seen = Some(timestamp);

        if by_ts.insert(timestamp, close).is_some() {
            report.duplicates += 1;
            if report.first_duplicate.is_none() {
                report.first_duplicate = Some(timestamp);
            }
        }
    }

    let points: Vec<PricePoint> = by_ts
        .into_iter()
        .map(|(timestamp, close)| PricePoint { timestamp, close })
        .collect();
    report.kept = points.len();
    report.first_timestamp = points.first().map(|p| p.timestamp);
    report.last_timestamp = points.last().map(|p| p.timestamp);
    (points, report)
}
