//! Query result shaping
//!
//! Turns a materialized frame into the value placed under `answer`: a single
//! cell becomes text, everything else becomes one JSON object per row.

use crate::error::{QaError, Result};
use polars::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};

/// Shaped query output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Records(Vec<Map<String, Value>>),
}

impl Answer {
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        if df.height() == 1 && df.width() == 1 {
            let value = series_to_json_value(&df.get_columns()[0], 0)?;
            return Ok(Answer::Text(json_value_to_text(&value)));
        }
        Ok(Answer::Records(dataframe_to_records(df)?))
    }
}

/// One map per row, keys in column order.
pub fn dataframe_to_records(df: &DataFrame) -> Result<Vec<Map<String, Value>>> {
    let columns = df.get_columns();
    let mut rows = Vec::with_capacity(df.height());

    for row_idx in 0..df.height() {
        let mut row = Map::new();
        for series in columns {
            let value = series_to_json_value(series, row_idx)?;
            row.insert(series.name().to_string(), value);
        }
        rows.push(row);
    }

    Ok(rows)
}

pub fn series_to_json_value(series: &Series, row_idx: usize) -> Result<Value> {
    let any_val = series
        .get(row_idx)
        .map_err(|e| QaError::Query(format!("Failed to get value: {}", e)))?;

    Ok(match any_val {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int8(i) => Value::Number(i.into()),
        AnyValue::Int16(i) => Value::Number(i.into()),
        AnyValue::Int32(i) => Value::Number(i.into()),
        AnyValue::Int64(i) => Value::Number(i.into()),
        AnyValue::UInt8(u) => Value::Number(u.into()),
        AnyValue::UInt16(u) => Value::Number(u.into()),
        AnyValue::UInt32(u) => Value::Number(u.into()),
        AnyValue::UInt64(u) => Value::Number(u.into()),
        AnyValue::Float32(f) => float_to_json(f as f64),
        AnyValue::Float64(f) => float_to_json(f),
        other => Value::String(other.to_string()),
    })
}

fn float_to_json(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Text form of a single cell: strings unquoted, everything else as JSON.
pub fn json_value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_cell_becomes_text() {
        let df = df!["count" => [42i64]].unwrap();
        assert_eq!(Answer::from_frame(&df).unwrap(), Answer::Text("42".to_string()));
    }

    #[test]
    fn single_string_cell_is_not_quoted() {
        let df = df!["name" => ["asha"]].unwrap();
        assert_eq!(Answer::from_frame(&df).unwrap(), Answer::Text("asha".to_string()));
    }

    #[test]
    fn single_float_cell_keeps_fraction() {
        let df = df!["avg_age" => [41.0f64]].unwrap();
        assert_eq!(Answer::from_frame(&df).unwrap(), Answer::Text("41.0".to_string()));
    }

    #[test]
    fn single_null_cell_renders_null() {
        let df = df!["bmi" => [None::<f64>]].unwrap();
        assert_eq!(Answer::from_frame(&df).unwrap(), Answer::Text("null".to_string()));
    }

    #[test]
    fn one_row_many_columns_becomes_records() {
        let df = df!["name" => ["asha"], "age" => [34i64]].unwrap();
        let answer = Answer::from_frame(&df).unwrap();
        assert_eq!(
            serde_json::to_value(&answer).unwrap(),
            json!([{"name": "asha", "age": 34}])
        );
    }

    #[test]
    fn many_rows_one_column_becomes_records() {
        let df = df!["age" => [34i64, 51]].unwrap();
        let answer = Answer::from_frame(&df).unwrap();
        assert_eq!(
            serde_json::to_value(&answer).unwrap(),
            json!([{"age": 34}, {"age": 51}])
        );
    }

    #[test]
    fn empty_result_becomes_empty_list() {
        let df = df!["age" => Vec::<i64>::new()].unwrap();
        assert_eq!(Answer::from_frame(&df).unwrap(), Answer::Records(Vec::new()));
    }

    #[test]
    fn records_keep_column_order_and_nulls() {
        let df = df![
            "zeta" => [Some(1i64), None],
            "alpha" => [Some("x"), Some("y")]
        ]
        .unwrap();
        let records = dataframe_to_records(&df).unwrap();
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(records[1]["zeta"], Value::Null);
        assert_eq!(records[1]["alpha"], json!("y"));
    }

    #[test]
    fn non_finite_floats_become_null() {
        let df = df!["ratio" => [f64::NAN, 0.5]].unwrap();
        let records = dataframe_to_records(&df).unwrap();
        assert_eq!(records[0]["ratio"], Value::Null);
        assert_eq!(records[1]["ratio"], json!(0.5));
    }
}
