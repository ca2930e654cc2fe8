// Performance benchmarks for value search, index search and retrieval
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deepfind_core::{
    path, ApproxComparator, ExactComparator, JsonOptions, PathStep, Retriever, SearchEngine, Tree,
    View,
};
use rand::prelude::*;
use rand::rngs::StdRng;

fn generate_random_document(rng: &mut StdRng, depth: usize, width: usize) -> serde_json::Value {
    if depth == 0 {
        return match rng.random_range(0..3) {
            0 => serde_json::json!(rng.random_range(0..100)),
            1 => serde_json::json!(rng.random_range(0.0..1.0)),
            _ => serde_json::json!(format!("item {}", rng.random_range(0..100))),
        };
    }
    if rng.random_bool(0.5) {
        let obj: serde_json::Map<String, serde_json::Value> = (0..width)
            .map(|i| (format!("k{}", i), generate_random_document(rng, depth - 1, width)))
            .collect();
        serde_json::Value::Object(obj)
    } else {
        (0..width)
            .map(|_| generate_random_document(rng, depth - 1, width))
            .collect()
    }
}

fn generate_tree(depth: usize, width: usize) -> Tree {
    let mut rng = StdRng::seed_from_u64(42);
    Tree::from_json(&generate_random_document(&mut rng, depth, width))
}

fn benchmark_value_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_search");

    for depth in [3, 5, 7].iter() {
        let tree = generate_tree(*depth, 4);
        let root = tree.root().unwrap();
        group.bench_with_input(BenchmarkId::new("exact", depth), depth, |b, _| {
            b.iter(|| {
                let count = SearchEngine::new()
                    .search_by_value(root, black_box(42), &ExactComparator)
                    .count();
                black_box(count);
            });
        });
        group.bench_with_input(BenchmarkId::new("approx", depth), depth, |b, _| {
            let cmp = ApproxComparator::absolute(0.01);
            b.iter(|| {
                let count = SearchEngine::new()
                    .search_by_value(root, black_box(0.5), &cmp)
                    .count();
                black_box(count);
            });
        });
    }

    group.finish();
}

fn benchmark_index_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_search");

    let tree = generate_tree(6, 4);
    let root = tree.root().unwrap();
    let key = PathStep::key("k1");
    let position = PathStep::Position(-1);

    group.bench_function("key", |b| {
        b.iter(|| {
            let count = SearchEngine::new()
                .search_by_index(root, black_box(&key), &ExactComparator)
                .count();
            black_box(count);
        });
    });
    group.bench_function("position", |b| {
        b.iter(|| {
            let count = SearchEngine::new()
                .search_by_index(root, black_box(&position), &ExactComparator)
                .count();
            black_box(count);
        });
    });

    group.finish();
}

fn benchmark_array_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_scan");

    let grid: Vec<Vec<i64>> = (0..256).map(|r| (0..256).map(|c| (r * c) % 97).collect()).collect();
    let tree = Tree::from_json_with(
        &serde_json::json!({ "grid": grid }),
        JsonOptions {
            pack_arrays: true,
            ..JsonOptions::default()
        },
    );
    let root = tree.root().unwrap();

    group.bench_function("flat_array_256x256", |b| {
        b.iter(|| {
            let count = SearchEngine::new()
                .search_by_value(root, black_box(13), &ExactComparator)
                .count();
            black_box(count);
        });
    });

    group.finish();
}

fn benchmark_batch_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_search");

    let tree = generate_tree(6, 4);
    let root = tree.root().unwrap();
    let targets: Vec<View<'_>> = (0..16).map(View::from).collect();

    group.bench_function("sequential", |b| {
        b.iter(|| {
            let engine = SearchEngine::new();
            let results: Vec<usize> = targets
                .iter()
                .map(|t| engine.search_by_value(root, *t, &ExactComparator).count())
                .collect();
            black_box(results);
        });
    });
    group.bench_function("parallel", |b| {
        b.iter(|| {
            let results = SearchEngine::new().par_search_by_value(root, &targets, &ExactComparator);
            black_box(results);
        });
    });

    group.finish();
}

fn benchmark_retrieval(c: &mut Criterion) {
    let mut group = c.benchmark_group("retrieval");

    let tree = generate_tree(6, 4);
    let root = tree.root().unwrap();
    let paths: Vec<_> = SearchEngine::new()
        .search_by_value(root, 42, &ExactComparator)
        .collect();
    let retriever = Retriever::new();
    let deep = path![0isize, 0isize, 0isize];

    group.bench_function("get_many", |b| {
        b.iter(|| {
            let found = retriever.get_many(root, paths.iter().cloned());
            black_box(found);
        });
    });
    group.bench_function("render_expression", |b| {
        b.iter(|| {
            black_box(retriever.render_expression(root, black_box(&deep)));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_value_search,
    benchmark_index_search,
    benchmark_array_scan,
    benchmark_batch_search,
    benchmark_retrieval
);
criterion_main!(benches);
