//! Forecast result parsing and quantile trajectory extraction.
//!
//! A forecaster may answer in one of two shapes:
//!
//! - **long**: one row per (id, timestamp, quantile) with the forecast in the
//!   value column;
//! - **wide**: one row per (id, timestamp) with a column per quantile level,
//!   labelled `0.5`, `q0.5`, `quantile_0.5` and so on.
//!
//! [`ForecastFrame::parse`] decides the shape once, up front, and anything it
//! cannot use becomes [`ForecastFrame::NoData`]. Extraction from `NoData` is an
//! empty result, which scores as zero risk downstream.

use crate::domain::drawdown::{infer_scale, Scale};
use crate::domain::error::RiskError;
use crate::domain::series::{CanonicalSeries, DEFAULT_SERIES_ID};
use crate::domain::table::{Column, Table};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastColumns {
    pub id: String,
    pub timestamp: String,
    pub quantile: String,
    /// Value column of the long shape; doubles as the wide-shape fallback.
    pub value: String,
}

impl Default for ForecastColumns {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            timestamp: "timestamp".to_string(),
            quantile: "quantile".to_string(),
            value: "target".to_string(),
        }
    }
}

/// A quantile level strictly inside (0, 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantileLevel(f64);

impl QuantileLevel {
    pub const MEDIAN: QuantileLevel = QuantileLevel(0.5);

    pub fn new(level: f64) -> Result<Self, RiskError> {
        if level > 0.0 && level < 1.0 {
            Ok(QuantileLevel(level))
        } else {
            Err(RiskError::validation(format!(
                "quantile level {} must lie strictly between 0 and 1",
                level
            )))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for QuantileLevel {
    fn default() -> Self {
        QuantileLevel::MEDIAN
    }
}

/// Where an extraction's values came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionSource {
    Long,
    WideQuantile { label: String, level: f64 },
    WideFallback { label: String },
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub source: ExtractionSource,
    pub scale: Scale,
    /// Trajectory per series id, each in timestamp order.
    pub trajectories: BTreeMap<String, Vec<f64>>,
}

impl Extraction {
    pub fn empty() -> Self {
        Self {
            source: ExtractionSource::NoData,
            scale: Scale::Log,
            trajectories: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Resolve an `Unknown` scale against the price history the forecast
    /// continues. The first finite forecast value is compared with the last
    /// observed log-price of the same series, or of the whole history when
    /// the ids do not line up. Without a usable pair the scale stays unknown.
    pub fn anchored(mut self, history: &CanonicalSeries) -> Self {
        if self.scale != Scale::Unknown {
            return self;
        }
        let pair = self.trajectories.iter().find_map(|(id, values)| {
            let sample = values.iter().copied().find(|v| v.is_finite())?;
            let anchor = history
                .values_for(id)
                .last()
                .copied()
                .or_else(|| history.points().last().map(|p| p.value))?;
            Some((sample, anchor))
        });
        if let Some((sample, anchor)) = pair {
            self.scale = infer_scale(sample, anchor);
            tracing::debug!(sample, anchor, scale = %self.scale, "inferred forecast scale from history");
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct LongForecast<'a> {
    keys: RowKeys<'a>,
    quantile: &'a Column,
    value: &'a Column,
}

#[derive(Debug, Clone)]
pub struct QuantileCandidate<'a> {
    pub label: &'a str,
    pub level: f64,
    column: &'a Column,
}

#[derive(Debug, Clone)]
pub struct WideForecast<'a> {
    keys: RowKeys<'a>,
    candidates: Vec<QuantileCandidate<'a>>,
    fallback: Option<(&'a str, &'a Column)>,
}

#[derive(Debug, Clone)]
pub enum ForecastFrame<'a> {
    Long(LongForecast<'a>),
    Wide(WideForecast<'a>),
    NoData,
}

#[derive(Debug, Clone, Copy)]
struct RowKeys<'a> {
    rows: usize,
    id: Option<&'a Column>,
    timestamp: Option<&'a Column>,
}

impl<'a> RowKeys<'a> {
    fn new(table: &'a Table, columns: &ForecastColumns) -> Self {
        Self {
            rows: table.row_count(),
            id: table.column(&columns.id),
            timestamp: table.column(&columns.timestamp),
        }
    }

    /// Group the given rows by series id, each group in timestamp order.
    /// Without a timestamp column input row order is kept.
    fn group(&self, rows: impl Iterator<Item = usize>) -> BTreeMap<String, Vec<usize>> {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for row in rows {
            let id = match self.id {
                Some(col) => col.label(row),
                None => DEFAULT_SERIES_ID.to_string(),
            };
            groups.entry(id).or_default().push(row);
        }
        if let Some(ts) = self.timestamp {
            for rows in groups.values_mut() {
                rows.sort_by(|&a, &b| ts.compare_rows(a, b));
            }
        }
        groups
    }
}

fn values_of(column: &Column, groups: BTreeMap<String, Vec<usize>>) -> BTreeMap<String, Vec<f64>> {
    groups
        .into_iter()
        .map(|(id, rows)| {
            let values = rows
                .into_iter()
                .map(|r| column.as_f64(r).unwrap_or(f64::NAN))
                .collect();
            (id, values)
        })
        .collect()
}

impl<'a> ForecastFrame<'a> {
    pub fn parse(table: &'a Table, columns: &ForecastColumns) -> ForecastFrame<'a> {
        let keys = RowKeys::new(table, columns);

        if let Some(quantile) = table.column(&columns.quantile) {
            return match table.column(&columns.value) {
                Some(value) => ForecastFrame::Long(LongForecast {
                    keys,
                    quantile,
                    value,
                }),
                None => {
                    tracing::debug!(
                        value_column = %columns.value,
                        "long forecast without a value column"
                    );
                    ForecastFrame::NoData
                }
            };
        }

        let reserved = [&columns.id, &columns.timestamp, &columns.value];
        let candidates: Vec<QuantileCandidate<'a>> = table
            .columns()
            .iter()
            .filter(|(name, _)| !reserved.contains(&name))
            .filter_map(|(name, column)| {
                parse_quantile_label(name).map(|level| QuantileCandidate {
                    label: name.as_str(),
                    level,
                    column,
                })
            })
            .collect();

        let fallback = table
            .columns()
            .iter()
            .find(|(name, _)| *name == columns.value)
            .map(|(name, column)| (name.as_str(), column));

        if candidates.is_empty() && fallback.is_none() {
            tracing::debug!(
                columns = ?table.column_names(),
                "forecast has neither quantile columns nor a fallback column"
            );
            return ForecastFrame::NoData;
        }

        ForecastFrame::Wide(WideForecast {
            keys,
            candidates,
            fallback,
        })
    }

    /// Trajectories for `level`. `fallback_scale` is attached when the values
    /// come from the wide fallback column; quantile paths are log-scale.
    pub fn extract(&self, level: QuantileLevel, fallback_scale: Scale) -> Extraction {
        match self {
            ForecastFrame::Long(long) => long.extract(level),
            ForecastFrame::Wide(wide) => wide.extract(level, fallback_scale),
            ForecastFrame::NoData => Extraction::empty(),
        }
    }
}

impl LongForecast<'_> {
    fn extract(&self, level: QuantileLevel) -> Extraction {
        let matching = (0..self.keys.rows).filter(|&r| self.quantile.as_f64(r) == Some(level.value()));
        let trajectories = values_of(self.value, self.keys.group(matching));
        tracing::debug!(
            level = level.value(),
            series = trajectories.len(),
            "extracted long-format quantile"
        );
        Extraction {
            source: ExtractionSource::Long,
            scale: Scale::Log,
            trajectories,
        }
    }
}

impl<'a> WideForecast<'a> {
    pub fn candidates(&self) -> &[QuantileCandidate<'a>] {
        &self.candidates
    }

    /// Candidate closest to `level`; the leftmost one wins a tie.
    pub fn closest(&self, level: QuantileLevel) -> Option<&QuantileCandidate<'a>> {
        let mut best: Option<(&QuantileCandidate<'a>, f64)> = None;
        for candidate in &self.candidates {
            let distance = (candidate.level - level.value()).abs();
            match best {
                Some((_, d)) if distance >= d => {}
                _ => best = Some((candidate, distance)),
            }
        }
        best.map(|(c, _)| c)
    }

    fn extract(&self, level: QuantileLevel, fallback_scale: Scale) -> Extraction {
        let (source, scale, column) = match self.closest(level) {
            Some(c) => (
                ExtractionSource::WideQuantile {
                    label: c.label.to_string(),
                    level: c.level,
                },
                Scale::Log,
                c.column,
            ),
            None => match self.fallback {
                Some((label, column)) => (
                    ExtractionSource::WideFallback {
                        label: label.to_string(),
                    },
                    fallback_scale,
                    column,
                ),
                None => return Extraction::empty(),
            },
        };
        tracing::debug!(?source, %scale, "selected wide-format column");
        Extraction {
            source,
            scale,
            trajectories: values_of(column, self.keys.group(0..self.keys.rows)),
        }
    }
}

/// Quantile level encoded in a column label: the whole label as a number, or
/// else its first embedded `digits[.digits]` run. Only ASCII digits count;
/// labels written in other numeral systems carry no level.
pub fn parse_quantile_label(label: &str) -> Option<f64> {
    if let Ok(v) = label.trim().parse::<f64>() {
        return v.is_finite().then_some(v);
    }
    embedded_number(label).and_then(|s| s.parse::<f64>().ok())
}

fn embedded_number(label: &str) -> Option<&str> {
    let bytes = label.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    Some(&label[start..end])
}

/// Parse `table` and extract the trajectories for `level` in one step.
pub fn extract_quantile(
    table: &Table,
    columns: &ForecastColumns,
    level: QuantileLevel,
    fallback_scale: Scale,
) -> Extraction {
    ForecastFrame::parse(table, columns).extract(level, fallback_scale)
}
