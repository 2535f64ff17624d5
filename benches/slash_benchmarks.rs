use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slash::clustering::logarithm::log_ratio;
use slash::hilbert::transform::{hilbert_axes, hilbert_index};
use slash::point::Point;

fn log_ratio_various() {
    let mut sum = 0.0;
    for numerator in 1..1000_u64 {
        for denominator in 1..10_u64 {
            let approximate_log = log_ratio(black_box(numerator), denominator);
            sum += approximate_log;
        }
    }
    let s = format!("sum = {}", sum);
    assert!(s.len() > 0);
}

fn library_log_various() {
    let mut sum = 0.0;
    for numerator in 1..1000_u64 {
        for denominator in 1..10_u64 {
            let library_log = (black_box(numerator) as f64 / denominator as f64).ln();
            sum += library_log;
        }
    }
    let s = format!("sum = {}", sum);
    assert!(s.len() > 0);
}

fn transform_round_trips() {
    // 100 dimensions at 20 bits, the shape the clustering pipeline works at.
    let coordinates : Vec<u32> = (0..100_u32).map(|d| (d * 7919 + 13) % 1_000_000).collect();
    for _ in 0..100 {
        let index = hilbert_index(black_box(&coordinates), 20);
        let axes = hilbert_axes(&index, 20, 100);
        assert_eq!(axes[0], coordinates[0]);
    }
}

fn distance_kernel_with_short_circuit() {
    let a : Vec<u32> = (0..100_u32).map(|d| (d * 104_729 + 7) % 1_000_000).collect();
    let b : Vec<u32> = (0..100_u32).map(|d| (d * 15_485_863 + 11) % 1_000_000).collect();
    let p = Point::with_id(0, &a);
    let q = Point::with_id(1, &b);
    let limit = p.square_distance(&q) / 2;
    let mut hits = 0;
    for _ in 0..10_000 {
        if p.is_square_distance_within(black_box(&q), black_box(limit)) { hits += 1; }
    }
    assert_eq!(hits, 0);
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Many logarithms using log_ratio", |b| b.iter(|| log_ratio_various()));
    c.bench_function("Many logarithms using std library ln", |b| b.iter(|| library_log_various()));
    c.bench_function("Hilbert transform round trips", |b| b.iter(|| transform_round_trips()));
    c.bench_function("Distance kernel with magnitude short circuit", |b| b.iter(|| distance_kernel_with_short_circuit()));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
