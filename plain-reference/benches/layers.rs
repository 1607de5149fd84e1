use criterion::{black_box, criterion_group, criterion_main, Criterion};
use plain_reference::layers::{self, ConvShape};
use rand::Rng;

fn random_vec(len: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn criterion_benchmark_layers(c: &mut Criterion) {
    let batch = 16;
    let input = random_vec(batch * 784);
    let weights = random_vec(784 * 128);
    let bias = random_vec(128);

    c.bench_function("plain fully_connected 784x128", |bench| {
        bench.iter(|| {
            black_box(layers::fully_connected(
                black_box(&input),
                &weights,
                &bias,
                batch,
                784,
                128,
            ))
        });
    });

    let shape = ConvShape {
        height: 28,
        width: 28,
        channels: 1,
        filter_size: 5,
        filters: 16,
        stride: 1,
        padding: 0,
    };
    let conv_w = random_vec(25 * 16);
    let conv_b = random_vec(16);
    c.bench_function("plain convolution 28x28 5x5x16", |bench| {
        bench.iter(|| {
            black_box(layers::convolution(
                black_box(&input),
                &conv_w,
                &conv_b,
                batch,
                shape,
            ))
        });
    });

    let pooled = random_vec(batch * 16 * 24 * 24);
    c.bench_function("plain maxpool 2x2", |bench| {
        bench.iter(|| black_box(layers::maxpool(black_box(&pooled), batch, 16, 24, 24, 2, 2)));
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = criterion_benchmark_layers
);
criterion_main!(benches);
