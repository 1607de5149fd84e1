//! Runs the three parties of a test as concurrent futures over [`PartyTestNetwork`].

use crate::prelude::{
    BatchConfig, Context, PartyKeys, PartyTestNetwork, SecurityLevel, TestNetwork3p,
};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::future::Future;

pub(crate) fn party_keys() -> [PartyKeys; 3] {
    let mut rng = ChaCha12Rng::from_entropy();
    PartyKeys::generate_all(&mut rng)
}

/// Small batches so that the tests go through several refills.
pub(crate) fn small_batches() -> BatchConfig {
    BatchConfig {
        triples: 64,
        random_bits: 512,
        truncation_masks: 16,
        matrix_triples: 1,
    }
}

pub(crate) async fn run_parties<F, Fut, T>(
    network: TestNetwork3p,
    security: SecurityLevel,
    batch: BatchConfig,
    party: F,
) -> [T; 3]
where
    F: Fn(Context<PartyTestNetwork>) -> Fut,
    Fut: Future<Output = T>,
{
    let [n0, n1, n2] = network.get_party_networks();
    let [k0, k1, k2] = party_keys();
    let party = &party;
    let setup = |net: PartyTestNetwork, keys: PartyKeys| async move {
        let ctx = Context::new(net, &keys, security, batch)
            .await
            .expect("context setup failed");
        party(ctx).await
    };
    let (r0, r1, r2) = tokio::join!(setup(n0, k0), setup(n1, k1), setup(n2, k2));
    [r0, r1, r2]
}

pub(crate) async fn run_semi_honest<F, Fut, T>(party: F) -> [T; 3]
where
    F: Fn(Context<PartyTestNetwork>) -> Fut,
    Fut: Future<Output = T>,
{
    run_parties(
        TestNetwork3p::new(),
        SecurityLevel::SemiHonest,
        small_batches(),
        party,
    )
    .await
}

pub(crate) fn assert_all_equal<T: PartialEq + std::fmt::Debug>(results: &[T; 3]) {
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], results[2]);
}
