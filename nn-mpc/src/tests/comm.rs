mod comm_test {
    use crate::prelude::{
        Comm, ConnectionState, Error, PartyID, PartyTestNetwork, RingElement, TestNetwork3p,
    };

    fn connected_comms() -> [Comm<PartyTestNetwork>; 3] {
        TestNetwork3p::new()
            .get_party_networks()
            .map(|net| Comm::connected(net).unwrap())
    }

    #[tokio::test]
    async fn lifecycle() {
        let [n0, n1, n2] = TestNetwork3p::new().get_party_networks();
        let mut c0 = Comm::new(PartyID::ID0);
        assert_eq!(c0.state(), ConnectionState::Uninitialized);
        assert!(matches!(
            c0.send_vec_next(&[RingElement(1u64)]).await,
            Err(Error::ConnectionError(_))
        ));

        c0.connect(n0).unwrap();
        assert_eq!(c0.state(), ConnectionState::Connected);
        let [spare, _, _] = TestNetwork3p::new().get_party_networks();
        assert!(matches!(c0.connect(spare), Err(Error::ConnectionError(_))));

        // connected but not yet synchronized
        assert!(matches!(
            c0.send_vec_next(&[RingElement(1u64)]).await,
            Err(Error::ConnectionError(_))
        ));
        assert_eq!(c0.round(), 0);

        let mut c1 = Comm::connected(n1).unwrap();
        let mut c2 = Comm::connected(n2).unwrap();
        let (r0, r1, r2) = tokio::join!(c0.synchronize(), c1.synchronize(), c2.synchronize());
        for r in [r0, r1, r2] {
            r.unwrap();
        }
        for c in [&c0, &c1, &c2] {
            assert_eq!(c.state(), ConnectionState::Synchronized);
        }

        let v = [RingElement(7u64)];
        let (r0, r1, r2) = tokio::join!(
            c0.send_and_receive_vec(&v),
            c1.send_and_receive_vec(&v),
            c2.send_and_receive_vec(&v),
        );
        for r in [r0, r1, r2] {
            assert_eq!(r.unwrap(), v.to_vec());
        }
        for c in [&c0, &c1, &c2] {
            assert_eq!(c.state(), ConnectionState::Active);
            assert_eq!(c.round(), 1);
        }

        // a later barrier brings everyone back to synchronized
        let (r0, r1, r2) = tokio::join!(c0.synchronize(), c1.synchronize(), c2.synchronize());
        for r in [r0, r1, r2] {
            r.unwrap();
        }
        assert_eq!(c1.state(), ConnectionState::Synchronized);

        c0.close().await.unwrap();
        assert_eq!(c0.state(), ConnectionState::Closed);
        assert!(matches!(
            c0.send_vec_next(&v).await,
            Err(Error::ConnectionError(_))
        ));
        assert!(matches!(c0.synchronize().await, Err(Error::ConnectionError(_))));
        let [spare, _, _] = TestNetwork3p::new().get_party_networks();
        assert!(matches!(c0.connect(spare), Err(Error::ConnectionError(_))));
    }

    #[tokio::test]
    async fn wrong_id_is_rejected() {
        let [_, n1, _] = TestNetwork3p::new().get_party_networks();
        let mut comm = Comm::new(PartyID::ID0);
        assert!(matches!(comm.connect(n1), Err(Error::IdError(1))));
        assert_eq!(comm.state(), ConnectionState::Uninitialized);
    }

    #[tokio::test]
    async fn barrier_detects_round_mismatch() {
        let [mut c0, mut c1, mut c2] = connected_comms();
        c0.next_round();
        let (r0, r1, r2) = tokio::join!(c0.synchronize(), c1.synchronize(), c2.synchronize());
        for r in [r0, r1, r2] {
            assert!(matches!(r, Err(Error::ProtocolDesync(_))), "{:?}", r);
        }
        for c in [&c0, &c1, &c2] {
            assert_eq!(c.state(), ConnectionState::Connected);
        }
    }
}
