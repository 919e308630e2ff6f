//! Chart data derived from uniform report rows

use serde::Serialize;
use serde_json::Value;

use crate::models::{Aggregation, Row, parse_float};

/// One label array and one numeric data array of equal length
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    /// Chart kind requested by the suggestion (`bar`, `line`, `pie`, ...)
    pub chart_type: String,
    /// Dataset label: the aggregated column, or the second projected column
    pub label: String,
    pub labels: Vec<Value>,
    /// Values that are not numeric are `None`
    pub data: Vec<Option<f64>>,
}

impl ChartData {
    /// A chart without data points
    pub fn empty(chart_type: impl Into<String>) -> Self {
        Self {
            chart_type: chart_type.into(),
            label: String::new(),
            labels: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label and value pairs, in row order
    pub fn points(&self) -> impl Iterator<Item = (&Value, Option<f64>)> {
        self.labels.iter().zip(self.data.iter().copied())
    }
}

/// Build chart data from uniform rows.
///
/// With an aggregation the labels are the group values and the data the aggregated
/// column. Otherwise the first column gives the labels and the second the data;
/// fewer than two columns give an empty chart.
pub fn build_chart(
    rows: &[Row],
    columns: &[String],
    aggregation: Option<&Aggregation>,
    chart_type: &str,
) -> ChartData {
    let (label_column, data_column) = match aggregation {
        Some(aggregation) => (
            aggregation.group_by.as_str(),
            aggregation.new_column_name.as_str(),
        ),
        None if columns.len() >= 2 => (columns[0].as_str(), columns[1].as_str()),
        None => return ChartData::empty(chart_type),
    };

    let (labels, data): (Vec<Value>, Vec<Option<f64>>) = rows
        .iter()
        .map(|row| {
            let label = row.get(label_column).cloned().unwrap_or(Value::Null);
            let value = row.get(data_column).and_then(parse_float);
            (label, value)
        })
        .unzip();

    ChartData {
        chart_type: chart_type.to_string(),
        label: data_column.to_string(),
        labels,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AggregationMethod;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Row> {
        values
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|v| v.as_object().cloned())
            .collect()
    }

    #[test]
    fn test_chart_from_first_two_columns() {
        let data = rows(json!([
            {"month": "Jan", "revenue": 10, "region": "N"},
            {"month": "Feb", "revenue": "n/a", "region": "S"}
        ]));
        let columns = vec!["month".to_string(), "revenue".to_string(), "region".to_string()];

        let chart = build_chart(&data, &columns, None, "line");
        assert_eq!(chart.chart_type, "line");
        assert_eq!(chart.label, "revenue");
        assert_eq!(chart.labels, vec![json!("Jan"), json!("Feb")]);
        assert_eq!(chart.data, vec![Some(10.0), None]);
    }

    #[test]
    fn test_chart_from_aggregation() {
        let data = rows(json!([{"p": "X", "total": 5}, {"p": "Y", "total": 2.5}]));
        let aggregation = Aggregation::new("p", "amount", AggregationMethod::Sum, "total");
        let chart = build_chart(&data, &[], Some(&aggregation), "bar");

        assert_eq!(chart.label, "total");
        assert_eq!(chart.len(), 2);
        assert_eq!(
            chart.points().collect::<Vec<_>>(),
            vec![(&json!("X"), Some(5.0)), (&json!("Y"), Some(2.5))]
        );
    }

    #[test]
    fn test_single_column_gives_empty_chart() {
        let data = rows(json!([{"month": "Jan"}]));
        let chart = build_chart(&data, &["month".to_string()], None, "pie");
        assert!(chart.is_empty());
        assert!(chart.data.is_empty());
    }
}
