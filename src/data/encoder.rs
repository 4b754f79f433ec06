//! Feature encoding: turns a cleaned `DataFrame` into a dense numeric matrix.
//!
//! Numeric and boolean columns pass through as `f64`. Every other column is
//! one-hot expanded into one indicator per observed category, named
//! `<column>_<category>`. Output columns follow the source column order, and
//! categories within a column are sorted.

use crate::error::{Result, TabfitError};
use ndarray::Array2;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Dense row-major feature matrix with stable column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }
}

/// How one source column is represented in the matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnEncoding {
    Numeric,
    Boolean,
    OneHot(Vec<String>),
}

/// Encode every column except `exclude`.
pub fn encode_features(df: &DataFrame, exclude: Option<&str>) -> Result<FeatureMatrix> {
    let n_rows = df.height();
    let mut names = Vec::new();
    let mut col_data: Vec<Vec<f64>> = Vec::new();

    for column in df.get_columns() {
        if Some(column.name().as_str()) == exclude {
            continue;
        }
        let series = column.as_materialized_series();
        let col_name = series.name().to_string();

        match encoding_for(series)? {
            ColumnEncoding::Numeric => {
                col_data.push(numeric_values(series)?);
                names.push(col_name);
            }
            ColumnEncoding::Boolean => {
                let values = series
                    .bool()?
                    .into_iter()
                    .map(|v| if v.unwrap_or(false) { 1.0 } else { 0.0 })
                    .collect();
                names.push(col_name);
                col_data.push(values);
            }
            ColumnEncoding::OneHot(categories) => {
                let index: BTreeMap<&str, usize> = categories
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (c.as_str(), i))
                    .collect();
                let mut indicators = vec![vec![0.0; n_rows]; categories.len()];

                let as_text = series.cast(&DataType::String)?;
                for (row, value) in as_text.str()?.into_iter().enumerate() {
                    if let Some(&slot) = value.and_then(|v| index.get(v)) {
                        indicators[slot][row] = 1.0;
                    }
                }

                for category in &categories {
                    names.push(format!("{}_{}", col_name, category));
                }
                col_data.extend(indicators);
            }
        }
    }

    let n_cols = col_data.len();
    if col_data.iter().any(|c| c.len() != n_rows) {
        return Err(TabfitError::ShapeError {
            expected: format!("{} rows per column", n_rows),
            actual: "ragged columns".to_string(),
        });
    }
    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    let values = Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]);

    Ok(FeatureMatrix { names, values })
}

/// Decide how a column is encoded from its dtype and contents.
pub fn encoding_for(series: &Series) -> Result<ColumnEncoding> {
    Ok(match series.dtype() {
        DataType::Int32
        | DataType::Int64
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => ColumnEncoding::Numeric,
        DataType::Boolean => ColumnEncoding::Boolean,
        _ => ColumnEncoding::OneHot(categories(series)?),
    })
}

/// Distinct non-null values of a column rendered as text, sorted.
fn categories(series: &Series) -> Result<Vec<String>> {
    let as_text = series.cast(&DataType::String)?;
    let mut seen: Vec<String> = as_text
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    seen.sort();
    seen.dedup();
    Ok(seen)
}

/// Column values as `f64`; infinities and NaN are rejected.
fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    let cast = series.cast(&DataType::Float64)?;
    cast.f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(v) if v.is_finite() => Ok(v),
            Some(v) => Err(TabfitError::DataError(format!(
                "feature column '{}' holds non-finite value {} at row {}",
                series.name(),
                v,
                row
            ))),
            None => Err(TabfitError::DataError(format!(
                "feature column '{}' has a missing value at row {}",
                series.name(),
                row
            ))),
        })
        .collect()
}
