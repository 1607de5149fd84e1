mod desync_test {
    use crate::{
        prelude::{
            share_plain, Error, NetworkTrait, RingElement, SecurityLevel, TestNetwork3p,
        },
        tests::test_config::{run_parties, run_semi_honest, small_batches},
    };
    use bytes::Bytes;
    use rand::{rngs::SmallRng, SeedableRng};
    use std::time::Duration;

    #[tokio::test]
    async fn short_buffer_is_detected() {
        let mut rng = SmallRng::from_entropy();
        let x = share_plain(&[RingElement(1u64), RingElement(2)], &mut rng);
        let x = &x;

        let results = run_semi_honest(|mut ctx| async move {
            let id = usize::from(ctx.get_id());
            if id == 1 {
                // 3 bytes where party 2 expects two ring elements
                let network = ctx.comm_mut().network_mut().expect("connected");
                network
                    .send_next_id(Bytes::from_static(&[1, 2, 3]))
                    .await
                    .unwrap();
            }
            ctx.reconstruct(&x[id]).await
        })
        .await;

        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(
            matches!(results[2], Err(Error::ProtocolDesync(_))),
            "{:?}",
            results[2]
        );
    }

    #[tokio::test]
    async fn round_mismatch_is_detected() {
        let results = run_semi_honest(|mut ctx| async move {
            if usize::from(ctx.get_id()) == 0 {
                ctx.comm_mut().next_round();
            }
            ctx.synchronize().await
        })
        .await;

        for res in results {
            assert!(matches!(res, Err(Error::ProtocolDesync(_))), "{:?}", res);
        }
    }

    #[tokio::test]
    async fn silent_party_times_out() {
        let mut rng = SmallRng::from_entropy();
        let x = share_plain(&[RingElement(1u64)], &mut rng);
        let x = &x;

        let results = run_parties(
            TestNetwork3p::with_timeout(Duration::from_millis(200)),
            SecurityLevel::SemiHonest,
            small_batches(),
            |mut ctx| async move {
                let id = usize::from(ctx.get_id());
                if id == 1 {
                    // stays connected but never answers
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    return Ok(Vec::new());
                }
                ctx.reconstruct(&x[id]).await
            },
        )
        .await;

        // party 0 hears from party 2, party 2 waits for party 1
        assert!(results[0].is_ok());
        assert!(
            matches!(results[2], Err(Error::ProtocolDesync(_))),
            "{:?}",
            results[2]
        );
    }

    #[tokio::test]
    async fn closed_peer_is_a_connection_error() {
        let results = run_semi_honest(|mut ctx| async move {
            if usize::from(ctx.get_id()) == 1 {
                return ctx.finish().await;
            }
            let zeros = ctx.zeros(1);
            ctx.reconstruct(&zeros).await.map(|_| ())
        })
        .await;

        assert!(results[1].is_ok());
        assert!(
            matches!(results[2], Err(Error::ConnectionError(_))),
            "{:?}",
            results[2]
        );
    }
}
