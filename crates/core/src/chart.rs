//! Chart data transformer: table rows to labelled numeric series.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use regex::Regex;

/// Longest numeric prefix accepted by `parseFloat`.
static FLOAT_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap()
});

/// Supported chart kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Area,
}

impl ChartType {
    /// Map a `chart-<subtype>` name; unknown subtypes draw as bars.
    pub fn from_subtype(subtype: &str) -> Self {
        match subtype.trim().to_ascii_lowercase().as_str() {
            "bar" | "column" => ChartType::Bar,
            "line" => ChartType::Line,
            "pie" | "doughnut" => ChartType::Pie,
            "area" => ChartType::Area,
            other => {
                log::warn!("Unknown chart type '{}', drawing a bar chart", other);
                ChartType::Bar
            }
        }
    }
}

/// One named series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub values: Vec<f64>,
}

/// Labelled category data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Pie charts draw a single series.
    pub fn first_dataset_only(&self) -> ChartData {
        ChartData {
            labels: self.labels.clone(),
            datasets: self.datasets.iter().take(1).cloned().collect(),
        }
    }
}

/// Convert table rows (header first) into chart data.
///
/// Column 0 labels each row; every other column is a dataset named by its
/// header. Cells that are not numbers, and missing cells, become `0` so all
/// datasets stay aligned with the labels.
pub fn transform(rows: &[Vec<String>]) -> ChartData {
    let [header, data @ ..] = rows else {
        return ChartData::default();
    };
    if data.is_empty() {
        return ChartData::default();
    }

    let labels = data
        .iter()
        .map(|row| row.first().map(|c| c.trim().to_string()).unwrap_or_default())
        .collect();
    let datasets = header
        .iter()
        .enumerate()
        .skip(1)
        .map(|(col, name)| Dataset {
            name: name.trim().to_string(),
            values: data
                .iter()
                .map(|row| row.get(col).map_or(0.0, |cell| parse_number(cell)))
                .collect(),
        })
        .collect();

    ChartData { labels, datasets }
}

/// `parseFloat` with `NaN` coerced to `0`.
pub fn parse_number(cell: &str) -> f64 {
    let Some(m) = FLOAT_PREFIX_REGEX.find(cell.trim_start()) else {
        return 0.0;
    };
    let value = match m.as_str().trim_start_matches('+') {
        "Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        number => number.parse::<f64>().unwrap_or(0.0),
    };
    if value.is_nan() {
        0.0
    } else {
        value
    }
}
