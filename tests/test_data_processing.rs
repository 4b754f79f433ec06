//! Integration tests for data processing: loading, cleaning, encoding and splitting

use polars::prelude::*;
use tabfit::data::{
    drop_null_rows, encode_features, ensure_column, train_test_split, CsvLoader, Label, LabelSet,
    TargetVector,
};
use tabfit::TabfitError;

const CSV: &str = "\
age,city,member,score
25,paris,true,1.5
32,berlin,false,2.5
,paris,true,3.0
47,NA,true,4.5
51,austin,false,NaN
38,berlin,true,6.0
";

// ============================================================================
// Loading and null handling
// ============================================================================

#[test]
fn test_null_tokens_and_empty_fields_are_dropped() {
    let df = CsvLoader::new().load_bytes(CSV.as_bytes()).unwrap();
    assert_eq!(df.height(), 6);

    let clean = drop_null_rows(&df).unwrap();
    assert_eq!(clean.height(), 3);
    let ages: Vec<Option<i64>> = clean.column("age").unwrap().i64().unwrap().into_iter().collect();
    assert_eq!(ages, vec![Some(25), Some(32), Some(38)]);

    let csv = "x,y\n1,10\nNULL,20\n3,None\nn/a,40\n5,<NA>\n#N/A,60\n7,-NaN\n8,80\n";
    let df = CsvLoader::new().load_bytes(csv.as_bytes()).unwrap();
    let clean = drop_null_rows(&df).unwrap();
    assert_eq!(clean.height(), 2);
    for name in ["x", "y"] {
        let dtype = clean.column(name).unwrap().dtype();
        assert!(matches!(dtype, DataType::Int64 | DataType::Float64), "{name}: {dtype:?}");
    }
}

#[test]
fn test_schema_check() {
    let df = CsvLoader::new().load_bytes(CSV.as_bytes()).unwrap();
    assert!(ensure_column(&df, "score").is_ok());
    assert!(matches!(
        ensure_column(&df, "Score"),
        Err(TabfitError::TargetNotFound(name)) if name == "Score"
    ));
}

#[test]
fn test_load_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    std::fs::write(&path, CSV).unwrap();
    let df = CsvLoader::new().load_path(&path).unwrap();
    assert_eq!(df.width(), 4);
}

#[test]
fn test_input_limit() {
    let loader = CsvLoader::new().with_max_input_bytes(16);
    assert!(loader.load_bytes(CSV.as_bytes()).is_err());
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_encoding_is_stable() {
    let df = drop_null_rows(&CsvLoader::new().load_bytes(CSV.as_bytes()).unwrap()).unwrap();
    let first = encode_features(&df, Some("score")).unwrap();
    let second = encode_features(&df, Some("score")).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.names, vec!["age", "city_berlin", "city_paris", "member"]);
    assert_eq!(first.values.row(2).to_vec(), vec![38.0, 1.0, 0.0, 1.0]);
}

#[test]
fn test_categories_come_from_clean_rows() {
    let df = drop_null_rows(&CsvLoader::new().load_bytes(CSV.as_bytes()).unwrap()).unwrap();
    let fm = encode_features(&df, None).unwrap();
    // "austin" only appeared on a dropped row
    assert!(!fm.names.iter().any(|n| n == "city_austin"));
    assert_eq!(fm.n_features(), 5);
}

// ============================================================================
// Targets
// ============================================================================

#[test]
fn test_target_keeps_source_types() {
    let df = df!(
        "n" => &[3i64, 1, 3],
        "s" => &["b", "a", "b"]
    )
    .unwrap();

    let ints = TargetVector::from_frame(&df, "n").unwrap();
    assert!(!ints.is_textual());
    assert_eq!(ints.n_distinct(), 2);
    assert_eq!(serde_json::to_value(&ints.labels).unwrap(), serde_json::json!([3, 1, 3]));

    let text = TargetVector::from_frame(&df, "s").unwrap();
    assert!(text.is_textual());
    let classes = LabelSet::from_labels(&text.labels);
    assert_eq!(classes.classes(), &[Label::Text("a".into()), Label::Text("b".into())]);
    assert_eq!(classes.encode(&text.labels).unwrap().to_vec(), vec![1.0, 0.0, 1.0]);
}

#[test]
fn test_non_numeric_target_names_offending_value() {
    let df = df!("y" => &["1", "2", "abc"]).unwrap();
    let err = TargetVector::from_frame(&df, "y").unwrap().to_numeric().unwrap_err();
    assert!(err.to_string().contains("['abc']"));
}

// ============================================================================
// Splitting
// ============================================================================

#[test]
fn test_split_is_repeatable() {
    let x = ndarray::Array2::from_shape_fn((50, 2), |(r, c)| (r * 2 + c) as f64);
    let y: Vec<usize> = (0..50).collect();

    let a = train_test_split(&x, &y).unwrap();
    let b = train_test_split(&x, &y).unwrap();
    assert_eq!(a.y_test, b.y_test);
    assert_eq!(a.y_test.len(), 10);
    assert_eq!(a.y_train.len(), 40);

    // Rows stay aligned with their targets
    for (row, &target) in a.x_test.rows().into_iter().zip(&a.y_test) {
        assert_eq!(row[0], (target * 2) as f64);
    }
}

#[test]
fn test_split_needs_two_rows() {
    let x = ndarray::Array2::<f64>::zeros((1, 1));
    assert!(train_test_split(&x, &[0.0]).is_err());
}
