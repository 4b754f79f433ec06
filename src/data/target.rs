//! Target column extraction.
//!
//! Labels keep the type they were read with so that results echo them back
//! unchanged: integers stay integers, text stays text.

use crate::error::{Result, TabfitError};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single raw target value.
#[derive(Debug, Clone)]
pub enum Label {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Label {
    fn rank(&self) -> u8 {
        match self {
            Label::Bool(_) => 0,
            Label::Int(_) | Label::Float(_) => 1,
            Label::Text(_) => 2,
        }
    }

    /// Numeric reading of the label, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Label::Int(v) => Some(*v as f64),
            Label::Float(v) => Some(*v),
            Label::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Label::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Label {}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Label::Int(a), Label::Int(b)) => a.cmp(b),
            (Label::Float(a), Label::Float(b)) => a.total_cmp(b),
            (Label::Int(a), Label::Float(b)) => (*a as f64).total_cmp(b),
            (Label::Float(a), Label::Int(b)) => a.total_cmp(&(*b as f64)),
            (Label::Bool(a), Label::Bool(b)) => a.cmp(b),
            (Label::Text(a), Label::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            // Int and Float compare numerically, so they hash through the same bits
            Label::Int(v) => (*v as f64).to_bits().hash(state),
            Label::Float(v) => v.to_bits().hash(state),
            Label::Bool(b) => b.hash(state),
            Label::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{}", v),
            Label::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Label::Float(v) => write!(f, "{}", v),
            Label::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Label::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Label::Int(v) => serializer.serialize_i64(*v),
            Label::Float(v) => serializer.serialize_f64(*v),
            Label::Bool(b) => serializer.serialize_bool(*b),
            Label::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Target column values aligned with the feature rows.
#[derive(Debug, Clone)]
pub struct TargetVector {
    pub name: String,
    pub labels: Vec<Label>,
    textual: bool,
}

impl TargetVector {
    /// Pull `name` out of an already null-free frame.
    pub fn from_frame(df: &DataFrame, name: &str) -> Result<Self> {
        let column = df
            .column(name)
            .map_err(|_| TabfitError::TargetNotFound(name.to_string()))?;
        let series = column.as_materialized_series();

        let (labels, textual) = match series.dtype() {
            DataType::Int32 | DataType::Int64 | DataType::UInt32 | DataType::UInt64 => {
                let cast = series.cast(&DataType::Int64)?;
                let labels = cast
                    .i64()?
                    .into_iter()
                    .map(|v| v.map(Label::Int).ok_or_else(|| null_target(name)))
                    .collect::<Result<Vec<_>>>()?;
                (labels, false)
            }
            DataType::Float32 | DataType::Float64 => {
                let cast = series.cast(&DataType::Float64)?;
                let labels = cast
                    .f64()?
                    .into_iter()
                    .map(|v| v.map(Label::Float).ok_or_else(|| null_target(name)))
                    .collect::<Result<Vec<_>>>()?;
                (labels, false)
            }
            DataType::Boolean => {
                let labels = series
                    .bool()?
                    .into_iter()
                    .map(|v| v.map(Label::Bool).ok_or_else(|| null_target(name)))
                    .collect::<Result<Vec<_>>>()?;
                (labels, false)
            }
            _ => {
                let cast = series.cast(&DataType::String)?;
                let labels = cast
                    .str()?
                    .into_iter()
                    .map(|v| {
                        v.map(|s| Label::Text(s.to_string()))
                            .ok_or_else(|| null_target(name))
                    })
                    .collect::<Result<Vec<_>>>()?;
                (labels, true)
            }
        };

        Ok(Self {
            name: name.to_string(),
            labels,
            textual,
        })
    }

    pub fn from_labels(name: &str, labels: Vec<Label>) -> Self {
        let textual = labels.iter().any(|l| matches!(l, Label::Text(_)));
        Self {
            name: name.to_string(),
            labels,
            textual,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Whether the column was read as text rather than numbers or booleans.
    pub fn is_textual(&self) -> bool {
        self.textual
    }

    pub fn n_distinct(&self) -> usize {
        self.labels.iter().collect::<HashSet<_>>().len()
    }

    /// Coerce every label to `f64`, reporting the first value that cannot be.
    pub fn to_numeric(&self) -> Result<Array1<f64>> {
        self.labels
            .iter()
            .map(|label| {
                label.as_f64().ok_or_else(|| TabfitError::NonNumericTarget {
                    sample: label.to_string(),
                })
            })
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }
}

fn null_target(name: &str) -> TabfitError {
    TabfitError::DataError(format!("target column '{}' contains nulls", name))
}

/// Sorted distinct classes of a target, mapped to dense indices.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    classes: Vec<Label>,
    index: HashMap<Label, usize>,
}

impl LabelSet {
    pub fn from_labels(labels: &[Label]) -> Self {
        let mut classes = labels.to_vec();
        classes.sort();
        classes.dedup();
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self { classes, index }
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn index_of(&self, label: &Label) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Map labels to class indices stored as `f64`.
    pub fn encode(&self, labels: &[Label]) -> Result<Array1<f64>> {
        labels
            .iter()
            .map(|l| {
                self.index_of(l).map(|i| i as f64).ok_or_else(|| {
                    TabfitError::DataError(format!("label '{}' is not a known class", l))
                })
            })
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }

    /// Map a predicted class index back to its label.
    pub fn decode(&self, index: f64) -> Result<Label> {
        let i = index.round();
        if i < 0.0 || !i.is_finite() || i as usize >= self.classes.len() {
            return Err(TabfitError::ComputationError(format!(
                "predicted class index {} out of range",
                index
            )));
        }
        Ok(self.classes[i as usize].clone())
    }
}
