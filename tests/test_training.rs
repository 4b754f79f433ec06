//! Integration test: Training pipeline end-to-end

use serde_json::{json, Value};
use tabfit::service::{ResponseEnvelope, TrainRequest, Trainer, TrainerConfig};
use tabfit::training::parse_hyperparams;
use tabfit::ErrorKind;

fn trainer() -> Trainer {
    Trainer::new(TrainerConfig::builtin()).unwrap()
}

/// `age,income,label` with 20 rows; older, richer rows are "yes".
fn people_csv() -> String {
    let mut csv = String::from("age,income,label\n");
    for i in 0..20 {
        let age = 20 + i * 2;
        let income = 30_000 + i * 2_500;
        let label = if i >= 10 { "yes" } else { "no" };
        csv.push_str(&format!("{},{},{}\n", age, income, label));
    }
    csv
}

/// `x,noise,y` where `y` takes `modulus` distinct integer values.
fn modulo_csv(rows: usize, modulus: usize) -> String {
    let mut csv = String::from("x,noise,y\n");
    for i in 0..rows {
        csv.push_str(&format!("{},{},{}\n", i, (i * 7) % 5, i % modulus));
    }
    csv
}

fn run(csv: &str, algorithm: &str, target: Option<&str>, params: &str) -> Value {
    let mut request = TrainRequest::new(algorithm).with_params(parse_hyperparams(params).unwrap());
    if let Some(target) = target {
        request = request.with_target(target);
    }
    serde_json::to_value(trainer().train(csv.as_bytes(), &request)).unwrap()
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_logistic_regression_classifies_text_labels() {
    let json = run(&people_csv(), "Logistic Regression", Some("label"), "{}");
    assert_eq!(json["status"], "success", "{json}");

    let results = &json["results"];
    assert_eq!(results["type"], "classification");
    let accuracy = results["accuracy"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&accuracy));

    let matrix = results["confusion_matrix"].as_array().unwrap();
    assert_eq!(matrix.len(), 2);
    assert!(matrix.iter().all(|row| row.as_array().unwrap().len() == 2));

    // Four test rows out of twenty
    assert_eq!(results["actual"].as_array().unwrap().len(), 4);
    assert!(results["actual"][0].is_string());
    assert!(results["report"]["weighted avg"]["support"].as_u64() == Some(4));
}

#[test]
fn test_kmeans_counts_every_row() {
    let json = run(&people_csv(), "K-Means Clustering", None, "{}");
    assert_eq!(json["status"], "success", "{json}");

    let results = &json["results"];
    assert_eq!(results["type"], "clustering");
    assert_eq!(results["algorithm"], "kmeans");
    let total: u64 = results["cluster_counts"]
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(total, 20);
    assert_eq!(results["labels_preview"].as_array().unwrap().len(), 20);
}

#[test]
fn test_non_numeric_regression_target_is_reported() {
    let csv = "x,y\n1,10\n2,abc\n3,30\n4,40\n5,50\n6,60\n";
    let json = run(csv, "Linear Regression", Some("y"), "");
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("non-numeric values like ['abc']"), "{message}");
    assert!(json.get("status").is_none());
}

// ============================================================================
// Task resolution
// ============================================================================

#[test]
fn test_twenty_distinct_values_is_regression() {
    let json = run(&modulo_csv(60, 20), "Decision Tree", Some("y"), "{}");
    assert_eq!(json["results"]["type"], "regression", "{json}");
    assert!(json["results"]["r2_score"].is_number());
}

#[test]
fn test_nineteen_distinct_values_is_classification() {
    let json = run(&modulo_csv(57, 19), "Decision Tree", Some("y"), "{}");
    assert_eq!(json["results"]["type"], "classification", "{json}");
    let matrix = json["results"]["confusion_matrix"].as_array().unwrap();
    assert_eq!(matrix.len(), 19);
}

#[test]
fn test_textual_target_is_classification_for_dual_mode() {
    let json = run(&people_csv(), "KNN", Some("label"), r#"{"n_neighbors": 3}"#);
    assert_eq!(json["results"]["type"], "classification", "{json}");
}

#[test]
fn test_linear_regression_reports_coefficients() {
    let mut csv = String::from("a,b,y\n");
    for i in 0..30 {
        let (a, b) = (i as f64, ((i * 3) % 7) as f64);
        csv.push_str(&format!("{},{},{}\n", a, b, 2.0 * a - b + 5.0));
    }
    let json = run(&csv, "Linear Regression", Some("y"), "{}");
    let results = &json["results"];
    assert_eq!(results["type"], "regression", "{json}");
    assert!(results["mse"].as_f64().unwrap() < 1e-9);
    let coefficients = results["coefficients"].as_array().unwrap();
    assert!((coefficients[0].as_f64().unwrap() - 2.0).abs() < 1e-6);
    assert!((coefficients[1].as_f64().unwrap() + 1.0).abs() < 1e-6);
    assert!((results["intercept"].as_f64().unwrap() - 5.0).abs() < 1e-6);
}

// ============================================================================
// Clustering details
// ============================================================================

#[test]
fn test_single_cluster_has_null_silhouette() {
    let json = run(&people_csv(), "K-Means Clustering", None, r#"{"n_clusters": 1}"#);
    let results = &json["results"];
    assert_eq!(results["n_clusters"], 1);
    assert!(results["silhouette"].is_null());
    assert_eq!(results["centers"].as_array().unwrap().len(), 1);
}

#[test]
fn test_clustering_excludes_named_target() {
    let json = run(&people_csv(), "K-Means Clustering", Some("label"), r#"{"n_clusters": 2}"#);
    let centers = json["results"]["centers"].as_array().unwrap();
    // age and income only; the label column is not one-hot encoded
    assert_eq!(centers[0].as_array().unwrap().len(), 2);
}

#[test]
fn test_dbscan_reports_noise() {
    let csv = "x,y\n0,0\n0.1,0\n0,0.1\n0.1,0.1\n10,10\n10.1,10\n10,10.1\n10.1,10.1\n50,50\n";
    let json = run(csv, "DBSCAN", None, r#"{"eps": 0.5, "min_samples": 3}"#);
    let results = &json["results"];
    assert_eq!(results["algorithm"], "dbscan");
    assert_eq!(results["n_clusters"], 2);
    assert_eq!(results["cluster_counts"]["-1"], 1);
    assert!(results.get("centers").is_none());
    assert!(results["silhouette"].as_f64().unwrap() > 0.9);
}

#[test]
fn test_agglomerative_clusters() {
    let csv = "x,y\n0,0\n0.1,0\n0,0.1\n10,10\n10.1,10\n10,10.1\n";
    let json = run(csv, "Agglomerative Clustering", None, r#"{"linkage": "average"}"#);
    let results = &json["results"];
    assert_eq!(results["algorithm"], "agglomerative");
    assert_eq!(results["n_clusters"], 2);
    assert_eq!(results["cluster_counts"]["0"], 3);
    assert_eq!(results["cluster_counts"]["1"], 3);
}

// ============================================================================
// Determinism and errors
// ============================================================================

#[test]
fn test_repeated_requests_are_identical() {
    let csv = people_csv();
    let request = TrainRequest::new("Random Forest")
        .with_target("label")
        .with_params(parse_hyperparams(r#"{"n_estimators": 10}"#).unwrap());
    let first = trainer().train(csv.as_bytes(), &request);
    let second = trainer().train(csv.as_bytes(), &request);
    assert!(first.is_success());
    assert_eq!(first, second);
}

#[test]
fn test_unknown_algorithm() {
    let envelope = trainer().train(people_csv().as_bytes(), &TrainRequest::new("XGBoost"));
    assert_eq!(envelope.error_kind(), Some(ErrorKind::UnrecognizedAlgorithm));
    let message = envelope.error().unwrap();
    assert!(message.starts_with("Unrecognized algorithm: 'XGBoost'"));
    assert!(message.contains("K-Means Clustering"));
}

#[test]
fn test_supervised_without_target() {
    let json = run(&people_csv(), "SVM", None, "{}");
    assert_eq!(json, json!({"error": "Target column required for SVM"}));
}

#[test]
fn test_missing_target_column() {
    let envelope: ResponseEnvelope = trainer().train(
        people_csv().as_bytes(),
        &TrainRequest::new("Naive Bayes").with_target("outcome"),
    );
    assert_eq!(envelope.error(), Some("Target column 'outcome' not found"));
    assert_eq!(envelope.error_kind(), Some(ErrorKind::Schema));
}

#[test]
fn test_invalid_hyperparameters() {
    let json = run(&people_csv(), "KNN", Some("label"), r#"{"n_neighbours": 3}"#);
    let message = json["error"].as_str().unwrap();
    assert!(message.starts_with("Invalid parameters for KNN"), "{message}");

    let json = run(&people_csv(), "DBSCAN", None, r#"{"eps": -1}"#);
    assert!(json["error"].as_str().unwrap().contains("eps"));
}

#[test]
fn test_rows_with_nulls_are_dropped() {
    let mut csv = people_csv();
    csv.push_str("50,,yes\nNA,1000,no\n");
    let json = run(&csv, "K-Means Clustering", None, r#"{"n_clusters": 2}"#);
    let total: u64 = json["results"]["cluster_counts"]
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(total, 20);
}

#[test]
fn test_null_tokens_in_regression_target_drop_the_row() {
    for token in ["None", "n/a", "<NA>", "#N/A", "NULL"] {
        let mut csv = String::from("x,y\n");
        for i in 0..20 {
            csv.push_str(&format!("{},{}\n", i, 3 * i + 1));
        }
        csv.push_str(&format!("21,{}\n{},5\n", token, token));
        let json = run(&csv, "Linear Regression", Some("y"), "{}");
        assert_eq!(json["status"], "success", "{token}: {json}");
        assert_eq!(json["results"]["actual"].as_array().unwrap().len(), 4);
        assert_eq!(json["results"]["coefficients"].as_array().unwrap().len(), 1);
    }
}

#[test]
fn test_infinite_feature_is_a_data_error() {
    let csv = "a,b\n1.0,3\ninf,3\n2.5,4\n3.5,5\n4.0,6\n";
    let envelope = trainer().train(
        csv.as_bytes(),
        &TrainRequest::new("K-Means Clustering").with_params(parse_hyperparams(r#"{"n_clusters": 2}"#).unwrap()),
    );
    assert_eq!(envelope.error_kind(), Some(ErrorKind::Data));
    assert!(envelope.error().unwrap().contains("non-finite"));
}

#[test]
fn test_train_csv_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.csv");
    std::fs::write(&path, people_csv()).unwrap();

    let request = TrainRequest::new("Naive Bayes").with_target("label");
    assert!(trainer().train_csv(&path, &request).is_success());

    let missing = trainer().train_csv(dir.path().join("absent.csv"), &request);
    assert_eq!(missing.error_kind(), Some(ErrorKind::Data));
}
