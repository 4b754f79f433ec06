use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tabfit::evaluation::silhouette_score;
use tabfit::service::{TrainRequest, Trainer, TrainerConfig};
use tabfit::training::{parse_hyperparams, Clusterer, KMeans};

fn create_csv(n_rows: usize, n_features: usize) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let header: Vec<String> = (0..n_features).map(|i| format!("feature_{}", i)).collect();
    let mut csv = format!("{},target\n", header.join(","));

    for _ in 0..n_rows {
        let values: Vec<f64> = (0..n_features).map(|_| rng.gen::<f64>() * 10.0).collect();
        let target = values.iter().sum::<f64>() + rng.gen::<f64>() * 0.1;
        let row: Vec<String> = values.iter().map(|v| format!("{:.4}", v)).collect();
        csv.push_str(&format!("{},{:.4}\n", row.join(","), target));
    }
    csv
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    let trainer = Trainer::new(TrainerConfig::builtin()).unwrap();

    for n_rows in [1000, 5000].iter() {
        let csv = create_csv(*n_rows, 10);
        for (algorithm, params) in [
            ("Linear Regression", "{}"),
            ("Random Forest", r#"{"n_estimators": 20}"#),
            ("KNN", "{}"),
        ] {
            let request = TrainRequest::new(algorithm)
                .with_target("target")
                .with_params(parse_hyperparams(params).unwrap());
            group.bench_with_input(BenchmarkId::new(algorithm, n_rows), &csv, |b, csv| {
                b.iter(|| trainer.train(black_box(csv.as_bytes()), &request))
            });
        }
    }

    group.finish();
}

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustering");
    group.sample_size(10);

    for n_rows in [500, 2000].iter() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let x = Array2::from_shape_fn((*n_rows, 4), |_| rng.gen::<f64>());

        group.bench_with_input(BenchmarkId::new("kmeans", n_rows), &x, |b, x| {
            b.iter(|| KMeans::new(5).fit_predict(black_box(x)).unwrap())
        });

        let labels = KMeans::new(5).fit_predict(&x).unwrap();
        group.bench_with_input(BenchmarkId::new("silhouette", n_rows), &x, |b, x| {
            b.iter(|| silhouette_score(black_box(x), &labels))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_clustering);
criterion_main!(benches);
