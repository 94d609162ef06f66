//! Decode heterogeneous metric payloads into the long-form `MetricTable`.
//!
//! Two input shapes are recognized:
//!
//! * **Nested**: `{"Revenue": {"Yearly": {"2023": 1000}}}`, `{"Revenue": {"Total": 5}}`
//!   or `{"Revenue": 5}`.
//! * **Per-year records**: `[{"year": 2023, "Revenue": 1000}]`, or the same list
//!   wrapped in an object as its only list of objects (`{"financials": [...]}`).
//!   Other array members, such as a list of source citations, do not make a
//!   payload per-year and are skipped.

use finsight_core::{canonical_metric_label, MetricRow, MetricTable, Period, ReportError, ReportResult};
use serde_json::{Map, Value};

/// Top-level shape of a raw metric payload
#[derive(Debug, Clone, Copy)]
pub enum RawMetrics<'a> {
    Nested(&'a Map<String, Value>),
    PerYear(&'a [Value]),
}

impl<'a> RawMetrics<'a> {
    pub fn detect(raw: &'a Value) -> ReportResult<Self> {
        match raw {
            Value::Array(records) => Ok(RawMetrics::PerYear(records)),
            Value::Object(map) => {
                let mut arrays = map
                    .values()
                    .filter_map(Value::as_array)
                    .filter(|items| is_record_list(items));
                match (arrays.next(), arrays.next()) {
                    (Some(records), None) => Ok(RawMetrics::PerYear(records)),
                    (Some(_), Some(_)) => Err(ReportError::MalformedInput(
                        "object holds more than one record list".to_string(),
                    )),
                    (None, _) => Ok(RawMetrics::Nested(map)),
                }
            }
            other => Err(ReportError::MalformedInput(format!(
                "expected a metric mapping or record list, got {}",
                json_kind(other)
            ))),
        }
    }

    pub fn decode(self, entity: &str) -> ReportResult<MetricTable> {
        match self {
            RawMetrics::Nested(map) => Ok(decode_nested(map, entity)),
            RawMetrics::PerYear(records) => decode_per_year(records, entity),
        }
    }
}

/// Normalize a raw metric payload into canonical rows stamped with `entity`.
pub fn normalize(raw: &Value, entity: &str) -> ReportResult<MetricTable> {
    RawMetrics::detect(raw)?.decode(entity)
}

fn is_record_list(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(Value::is_object)
}

fn decode_nested(map: &Map<String, Value>, entity: &str) -> MetricTable {
    let mut table = MetricTable::new();

    for (label, body) in map {
        let Some(metric) = canonical_metric_label(label) else {
            continue;
        };

        match body {
            Value::Object(periods) => {
                for (key, inner) in periods {
                    decode_period_entry(&mut table, entity, &metric, key, inner);
                }
            }
            Value::Array(_) => {}
            scalar => {
                table.insert(
                    MetricRow::new(entity, None, metric.as_str(), coerce_value(scalar))
                        .with_period(Period::Total),
                );
            }
        }
    }

    table
}

fn decode_period_entry(table: &mut MetricTable, entity: &str, metric: &str, key: &str, inner: &Value) {
    if let Some(period) = Period::from_label(key) {
        match inner {
            Value::Object(by_year) => {
                for (year_key, value) in by_year {
                    let period = match period {
                        Period::Quarterly { .. } => Period::Quarterly {
                            quarter: parse_quarter(year_key),
                        },
                        other => other,
                    };
                    table.insert(
                        MetricRow::new(entity, parse_year(year_key), metric, coerce_value(value))
                            .with_period(period),
                    );
                }
            }
            scalar => {
                table.insert(
                    MetricRow::new(entity, None, metric, coerce_value(scalar)).with_period(period),
                );
            }
        }
        return;
    }

    // metric -> {year -> value}, period type omitted
    let period = match (parse_year(key), parse_quarter(key)) {
        (_, Some(q)) => Period::Quarterly { quarter: Some(q) },
        (Some(_), None) => Period::Yearly,
        (None, None) => Period::Total,
    };
    table.insert(MetricRow::new(entity, parse_year(key), metric, coerce_value(inner)).with_period(period));
}

fn decode_per_year(records: &[Value], entity: &str) -> ReportResult<MetricTable> {
    let mut table = MetricTable::new();

    for (idx, record) in records.iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(ReportError::MalformedInput(format!(
                "record {} is {}, expected an object",
                idx,
                json_kind(record)
            )));
        };

        let year = fields
            .iter()
            .find(|(k, _)| is_year_field(k))
            .and_then(|(_, v)| year_value(v));

        for (label, value) in fields {
            if is_year_field(label) {
                continue;
            }
            let Some(metric) = canonical_metric_label(label) else {
                continue;
            };
            table.insert(MetricRow::new(entity, year, metric, coerce_value(value)));
        }
    }

    Ok(table)
}

fn is_year_field(key: &str) -> bool {
    key.trim().eq_ignore_ascii_case("year")
}

fn year_value(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => parse_year(s),
        _ => None,
    }
}

/// Coerce a JSON leaf to a finite number.
///
/// Strings lose grouping commas and surrounding whitespace before parsing.
/// Anything else (null, booleans, nested structures) is absent.
pub fn coerce_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// First run of exactly four digits in `key` ("FY2023" -> 2023).
pub fn parse_year(key: &str) -> Option<i32> {
    let bytes = key.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                return key[start..i].parse().ok();
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Quarter from a `Qn` token ("Q3 2023", "2023Q3", "q1").
pub fn parse_quarter(key: &str) -> Option<u8> {
    let bytes = key.as_bytes();
    for i in 0..bytes.len() {
        if !bytes[i].eq_ignore_ascii_case(&b'q') {
            continue;
        }
        let prev_is_letter = i > 0 && bytes[i - 1].is_ascii_alphabetic();
        let Some(&digit) = bytes.get(i + 1) else {
            continue;
        };
        let next_is_digit = bytes.get(i + 2).is_some_and(|b| b.is_ascii_digit());
        if !prev_is_letter && (b'1'..=b'4').contains(&digit) && !next_is_digit {
            return Some(digit - b'0');
        }
    }
    None
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
