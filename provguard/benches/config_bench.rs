//! Benchmarks for configuration loading and placeholder scanning.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write as _;
use std::fs;

use provguard::config::{contains_placeholder, load};

fn config_text(keys: usize, value: impl Fn(usize) -> String) -> String {
    let mut text = String::new();
    for i in 0..keys {
        let _ = writeln!(text, "option_{i} = \"{}\"", value(i));
    }
    text.push_str("\n[paths]\n");
    for i in 0..keys {
        let _ = writeln!(text, "dir_{i} = \"{}\"", value(i));
    }
    text
}

fn config_benchmark(c: &mut Criterion) {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let template = dir.path().join("config.template.toml");
    let actual = dir.path().join("config.toml");
    if fs::write(&template, config_text(50, |i| format!("<value {i}>"))).is_err()
        || fs::write(&actual, config_text(50, |i| format!("/data/{i}"))).is_err()
    {
        return;
    }

    c.bench_function("load_100_keys", |b| {
        b.iter(|| load(black_box(&template), black_box(&actual)))
    });

    let nested = serde_json::json!({
        "a": ["/data/x", {"b": "/data/y", "c": [1, 2, 3]}],
        "d": {"e": {"f": "<unset>"}},
    });
    c.bench_function("contains_placeholder_nested", |b| {
        b.iter(|| contains_placeholder(black_box(&nested)))
    });
}

criterion_group!(benches, config_benchmark);
criterion_main!(benches);
