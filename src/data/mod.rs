//! Dataset ingestion, feature encoding, target extraction and splitting

pub mod encoder;
pub mod loader;
pub mod split;
pub mod target;

pub use encoder::{encode_features, ColumnEncoding, FeatureMatrix};
pub use loader::{drop_null_rows, ensure_column, CsvLoader};
pub use split::{train_test_indices, train_test_split, SplitIndices, TrainTestSplit};
pub use target::{Label, LabelSet, TargetVector};
