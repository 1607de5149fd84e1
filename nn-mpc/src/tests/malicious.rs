mod malicious_test {
    use crate::{
        prelude::{
            fixed_point, share_plain, Error, RingElement, SecurityLevel, TestNetwork3p,
        },
        rep3::verify::hash_zero_check,
        tests::test_config::{assert_all_equal, run_parties, small_batches},
    };
    use num_traits::One;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    const NUM_VALUES: usize = 50;

    #[tokio::test]
    async fn honest_run_passes_checks() {
        let mut rng = SmallRng::from_entropy();
        let x: Vec<f64> = (0..NUM_VALUES).map(|_| rng.gen_range(-10.0..10.0)).collect();
        let y: Vec<f64> = (0..NUM_VALUES).map(|_| rng.gen_range(-10.0..10.0)).collect();
        let x_shares = share_plain(&fixed_point::encode_slice(&x), &mut rng);
        let y_shares = share_plain(&fixed_point::encode_slice(&y), &mut rng);
        let (x_shares, y_shares) = (&x_shares, &y_shares);

        let results = run_parties(
            TestNetwork3p::new(),
            SecurityLevel::Malicious,
            small_batches(),
            |mut ctx| async move {
                let id = usize::from(ctx.get_id());
                let (x, y) = (&x_shares[id], &y_shares[id]);
                let product = ctx.mul_fixed(x, y).await.unwrap();
                let matrix = ctx.matmul_fixed(x, y, 1, NUM_VALUES, 1).await.unwrap();
                let lt = ctx.lt(x, y).await.unwrap();
                let res = (
                    ctx.reconstruct_fixed(&product).await.unwrap(),
                    ctx.reconstruct_fixed(&matrix).await.unwrap(),
                    ctx.reconstruct(&lt).await.unwrap(),
                );
                ctx.finish().await.unwrap();
                res
            },
        )
        .await;

        assert_all_equal(&results);
        let (product, matrix, lt) = &results[0];
        let x: Vec<f64> = fixed_point::decode_slice(&fixed_point::encode_slice(&x));
        let y: Vec<f64> = fixed_point::decode_slice(&fixed_point::encode_slice(&y));
        let mut dot = 0.0;
        for i in 0..NUM_VALUES {
            assert!((product[i] - x[i] * y[i]).abs() <= fixed_point::ulp() + 1e-9);
            assert_eq!(lt[i], RingElement((x[i] < y[i]) as u64));
            dot += x[i] * y[i];
        }
        assert!((matrix[0] - dot).abs() <= fixed_point::ulp() + 1e-9);
    }

    #[tokio::test]
    async fn corrupt_triple_is_detected() {
        let mut rng = SmallRng::from_entropy();
        let x = share_plain(&[RingElement(3u64), RingElement(4)], &mut rng);
        let y = share_plain(&[RingElement(5u64), RingElement(6)], &mut rng);
        let (x, y) = (&x, &y);

        let results = run_parties(
            TestNetwork3p::new(),
            SecurityLevel::Malicious,
            small_batches(),
            |mut ctx| async move {
                let id = usize::from(ctx.get_id());
                let mut triples = ctx.get_triples(2).await?;
                if id == 1 {
                    triples.c.a[0] += RingElement::one();
                }
                let z = ctx.mul_with_triples(&x[id], &y[id], triples).await?;
                ctx.reconstruct(&z).await
            },
        )
        .await;

        for res in results {
            assert!(
                matches!(res, Err(Error::ConsistencyCheckFailure(_))),
                "{:?}",
                res
            );
        }
    }

    #[tokio::test]
    async fn semi_honest_does_not_check() {
        let mut rng = SmallRng::from_entropy();
        let x = share_plain(&[RingElement(3u64)], &mut rng);
        let x = &x;

        let results = run_parties(
            TestNetwork3p::new(),
            SecurityLevel::SemiHonest,
            small_batches(),
            |mut ctx| async move {
                let id = usize::from(ctx.get_id());
                let mut triples = ctx.get_triples(1).await.unwrap();
                if id == 1 {
                    triples.c.a[0] += RingElement::one();
                }
                let z = ctx.mul_with_triples(&x[id], &x[id], triples).await.unwrap();
                let res = ctx.reconstruct(&z).await.unwrap();
                ctx.finish().await.unwrap();
                res
            },
        )
        .await;

        // party 1 holds the corrupted component itself, so its view differs
        assert_eq!(results[0], vec![RingElement(9)]);
        assert_eq!(results[2], vec![RingElement(9)]);
        assert_eq!(results[1], vec![RingElement(10)]);
    }

    #[tokio::test]
    async fn zero_check_test() {
        let mut rng = SmallRng::from_entropy();
        let zeros = share_plain(&[RingElement(0u64); 8], &mut rng);
        let mut values = [RingElement(0u64); 8];
        values[5] = RingElement(5);
        let non_zero = share_plain(&values, &mut rng);
        let (zeros, non_zero) = (&zeros, &non_zero);

        let results = run_parties(
            TestNetwork3p::new(),
            SecurityLevel::Malicious,
            small_batches(),
            |mut ctx| async move {
                let id = usize::from(ctx.get_id());
                let passed = hash_zero_check(ctx.comm_mut(), &zeros[id]).await;
                let failed = hash_zero_check(ctx.comm_mut(), &non_zero[id]).await;
                (passed.is_ok(), matches!(failed, Err(Error::ConsistencyCheckFailure(_))))
            },
        )
        .await;

        for res in results {
            assert_eq!(res, (true, true));
        }
    }
}
