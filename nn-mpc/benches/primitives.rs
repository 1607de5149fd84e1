use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nn_mpc::prelude::{
    share_plain, BatchConfig, Context, PartyKeys, PartyTestNetwork, RingElement, SecurityLevel,
    TestNetwork3p, VecShare,
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

#[derive(Clone, Copy)]
enum Op {
    Mul,
    Compare,
}

async fn party(
    net: PartyTestNetwork,
    keys: PartyKeys,
    security: SecurityLevel,
    x: VecShare<u64>,
    y: VecShare<u64>,
    op: Op,
) {
    let mut ctx = Context::new(net, &keys, security, BatchConfig::default())
        .await
        .expect("context setup");
    let res = match op {
        Op::Mul => ctx.mul(&x, &y).await,
        Op::Compare => ctx.lt(&x, &y).await,
    }
    .expect("protocol run");
    black_box(res);
    ctx.finish().await.expect("finish");
}

// three parties over the in-process network, including the setup barrier
async fn run(
    security: SecurityLevel,
    x: &[VecShare<u64>; 3],
    y: &[VecShare<u64>; 3],
    op: Op,
) {
    let [n0, n1, n2] = TestNetwork3p::new().get_party_networks();
    let [k0, k1, k2] = PartyKeys::generate_all(&mut ChaCha12Rng::from_entropy());
    tokio::join!(
        party(n0, k0, security, x[0].to_owned(), y[0].to_owned(), op),
        party(n1, k1, security, x[1].to_owned(), y[1].to_owned(), op),
        party(n2, k2, security, x[2].to_owned(), y[2].to_owned(), op),
    );
}

fn criterion_benchmark_primitives(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    let mut rng = SmallRng::from_entropy();

    for size in [1024usize, 8192] {
        let x: Vec<RingElement<u64>> = (0..size)
            .map(|_| RingElement(rng.gen::<i32>() as i64 as u64))
            .collect();
        let y: Vec<RingElement<u64>> = (0..size)
            .map(|_| RingElement(rng.gen::<i32>() as i64 as u64))
            .collect();
        let x = share_plain(&x, &mut rng);
        let y = share_plain(&y, &mut rng);

        let mut group = c.benchmark_group(format!("primitives/{}", size));
        for (name, security) in [
            ("semi-honest", SecurityLevel::SemiHonest),
            ("malicious", SecurityLevel::Malicious),
        ] {
            group.bench_with_input(BenchmarkId::new("mul", name), &security, |b, s| {
                b.to_async(&runtime).iter(|| run(*s, &x, &y, Op::Mul));
            });
            group.bench_with_input(BenchmarkId::new("compare", name), &security, |b, s| {
                b.to_async(&runtime).iter(|| run(*s, &x, &y, Op::Compare));
            });
        }
        group.finish();
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = criterion_benchmark_primitives
);
criterion_main!(benches);
