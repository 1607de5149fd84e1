mod network_tcp_test {
    use crate::{
        prelude::{
            share_plain, BatchConfig, Context, PartyKeys, Rep3Network, RingElement,
            SecurityLevel, VecShare,
        },
        tests::test_config::{assert_all_equal, party_keys},
    };
    use mpc_net::config::{NetworkConfig, NetworkParty};
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use serial_test::serial;

    const BASE_PORT: u16 = 11000;

    fn get_config(id: usize, port_offset: u16) -> NetworkConfig {
        let parties = (0..3)
            .map(|i| NetworkParty {
                id: i,
                socket_addr: format!("127.0.0.1:{}", BASE_PORT + port_offset + i as u16)
                    .parse()
                    .expect("valid address"),
            })
            .collect();
        let mut config = NetworkConfig::new(parties, id);
        config.timeout_secs = 10;
        config
    }

    #[test]
    fn test_network_config() {
        for i in 0..3 {
            assert!(get_config(i, 0).check_config().is_ok());
        }
        let mut config = get_config(0, 0);
        config.parties[1].id = 0;
        assert!(config.check_config().is_err());
    }

    async fn mul_party(
        id: usize,
        port_offset: u16,
        keys: PartyKeys,
        x: VecShare<u64>,
    ) -> (Vec<RingElement<u64>>, u64) {
        let network = Rep3Network::new(get_config(id, port_offset))
            .await
            .expect("network setup");
        let mut ctx = Context::new(network, &keys, SecurityLevel::Malicious, BatchConfig::default())
            .await
            .expect("context setup");
        let z = ctx.mul(&x, &x).await.unwrap();
        let res = ctx.reconstruct(&z).await.unwrap();
        let mut stats = Vec::new();
        ctx.print_connection_stats(&mut stats).unwrap();
        let stats = String::from_utf8_lossy(&stats);
        assert!(stats.contains("Rounds"));
        assert!(stats.contains("link to next"));
        let rounds = ctx.round();
        ctx.finish().await.unwrap();
        (res, rounds)
    }

    #[tokio::test]
    #[serial]
    async fn tcp_mul_test() {
        let mut rng = SmallRng::from_entropy();
        let values: Vec<RingElement<u64>> = (0..64).map(|_| rng.gen()).collect();
        let [s0, s1, s2] = share_plain(&values, &mut rng);
        let [k0, k1, k2] = party_keys();

        let (r0, r1, r2) = tokio::join!(
            mul_party(0, 0, k0, s0),
            mul_party(1, 0, k1, s1),
            mul_party(2, 0, k2, s2),
        );
        let results = [r0, r1, r2];
        assert_all_equal(&results);
        for (res, v) in results[0].0.iter().zip(values.iter()) {
            assert_eq!(*res, *v * *v);
        }
    }

    #[tokio::test]
    #[serial]
    async fn wrong_party_count_is_rejected() {
        let mut config = get_config(0, 10);
        config.parties.truncate(2);
        assert!(Rep3Network::new(config).await.is_err());
    }
}
