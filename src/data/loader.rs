//! CSV ingestion into a Polars `DataFrame`

use crate::error::{Result, TabfitError};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Tokens read as missing values in any column.
pub const NULL_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Default ceiling on the size of an uploaded dataset.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 100 * 1024 * 1024;

/// Reads UTF-8 CSV data with a header row.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    /// Rows scanned for schema inference; `None` scans the whole input
    infer_schema_length: Option<usize>,
    max_input_bytes: usize,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }

    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    pub fn with_max_input_bytes(mut self, bytes: usize) -> Self {
        self.max_input_bytes = bytes;
        self
    }

    /// Parse an in-memory CSV payload.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<DataFrame> {
        if bytes.len() > self.max_input_bytes {
            return Err(TabfitError::DataError(format!(
                "dataset is {} bytes, limit is {}",
                bytes.len(),
                self.max_input_bytes
            )));
        }
        std::str::from_utf8(bytes)
            .map_err(|e| TabfitError::DataError(format!("dataset is not valid UTF-8: {e}")))?;

        let null_values = NullValues::AllColumns(NULL_TOKENS.iter().map(|t| (*t).into()).collect());
        let parse_opts = CsvParseOptions::default()
            .with_null_values(Some(null_values))
            .with_missing_is_null(true);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
            .finish()?;

        debug!(rows = df.height(), columns = df.width(), "Parsed CSV dataset");
        Ok(df)
    }

    /// Read and parse a CSV file.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let bytes = std::fs::read(path.as_ref())?;
        self.load_bytes(&bytes)
    }
}

/// Fail unless `name` is one of the frame's columns.
pub fn ensure_column(df: &DataFrame, name: &str) -> Result<()> {
    if df.get_column_names().iter().any(|c| c.as_str() == name) {
        Ok(())
    } else {
        Err(TabfitError::TargetNotFound(name.to_string()))
    }
}

/// Remove every row holding a null (or a floating-point NaN) in any column.
pub fn drop_null_rows(df: &DataFrame) -> Result<DataFrame> {
    let mut keep = vec![true; df.height()];

    for column in df.get_columns() {
        let series = column.as_materialized_series();
        if series.null_count() > 0 {
            for (flag, present) in keep.iter_mut().zip(series.is_not_null().into_iter()) {
                if present != Some(true) {
                    *flag = false;
                }
            }
        }
        if matches!(series.dtype(), DataType::Float32 | DataType::Float64) {
            let values = series.cast(&DataType::Float64)?;
            for (flag, v) in keep.iter_mut().zip(values.f64()?.into_iter()) {
                if v.is_some_and(f64::is_nan) {
                    *flag = false;
                }
            }
        }
    }

    let kept = keep.iter().filter(|k| **k).count();
    if kept == df.height() {
        return Ok(df.clone());
    }

    debug!(before = df.height(), after = kept, "Dropped rows with missing values");
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "age,income,label\n25,40000,yes\n32,,no\n47,88000,yes\nNA,51000,no\n";

    #[test]
    fn test_load_bytes() {
        let df = CsvLoader::new().load_bytes(CSV.as_bytes()).unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_drop_null_rows() {
        let df = CsvLoader::new().load_bytes(CSV.as_bytes()).unwrap();
        let clean = drop_null_rows(&df).unwrap();
        assert_eq!(clean.height(), 2);
    }

    #[test]
    fn test_every_null_token_is_missing() {
        for token in NULL_TOKENS.iter().filter(|t| !t.is_empty()) {
            let csv = format!("x,y\n1,2\n{token},4\n5,{token}\n7,8\n");
            let df = CsvLoader::new().load_bytes(csv.as_bytes()).unwrap();
            for name in ["x", "y"] {
                let dtype = df.column(name).unwrap().dtype().clone();
                assert!(
                    matches!(dtype, DataType::Int64 | DataType::Float64),
                    "token {token:?} made {name} {dtype:?}"
                );
            }
            assert_eq!(drop_null_rows(&df).unwrap().height(), 2, "token {token:?}");
        }
    }

    #[test]
    fn test_ensure_column() {
        let df = CsvLoader::new().load_bytes(CSV.as_bytes()).unwrap();
        assert!(ensure_column(&df, "label").is_ok());
        let err = ensure_column(&df, "missing").unwrap_err();
        assert_eq!(err.to_string(), "Target column 'missing' not found");
    }

    #[test]
    fn test_size_limit() {
        let loader = CsvLoader::new().with_max_input_bytes(8);
        assert!(matches!(
            loader.load_bytes(CSV.as_bytes()),
            Err(TabfitError::DataError(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let bytes = [b'a', b'\n', 0xff, 0xfe, b'\n'];
        assert!(CsvLoader::new().load_bytes(&bytes).is_err());
    }
}
