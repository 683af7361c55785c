//! Structured report entries produced by the analyzer
//!
//! The analysis core never prints; it returns a list of entries that a
//! surface (terminal, JSON) renders.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One line, chart or table of an analysis report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum ReportEntry {
    Info(String),
    Warning(String),
    Success(String),
    Error(String),
    Plot(PlotSpec),
    Table(TableSpec),
}

impl ReportEntry {
    pub fn info(msg: impl Into<String>) -> Self {
        ReportEntry::Info(msg.into())
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        ReportEntry::Warning(msg.into())
    }

    pub fn success(msg: impl Into<String>) -> Self {
        ReportEntry::Success(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        ReportEntry::Error(msg.into())
    }
}

/// Line chart over time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<DateTime<Utc>>,
    pub series: Vec<PlotSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    pub label: String,
    /// Same length as the plot's `x`; `None` where undefined
    pub values: Vec<Option<f64>>,
}

impl PlotSeries {
    pub fn new(label: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        PlotSeries {
            label: label.into(),
            values,
        }
    }

    pub fn dense(label: impl Into<String>, values: &[f64]) -> Self {
        PlotSeries::new(label, values.iter().copied().map(Some).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSpec {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
