use farebox_core::{
    splice_consumer_path, CandidateProtocol, IceCandidate, RelayGrant, SpliceError,
};
use rand::{thread_rng, Rng};

fn random_candidate(rng: &mut impl Rng) -> IceCandidate {
    let protocol = if rng.gen_bool(0.5) {
        CandidateProtocol::Udp
    } else {
        CandidateProtocol::Tcp
    };
    IceCandidate {
        foundation: format!("candidate{}", rng.gen_range(0..8)),
        priority: rng.gen(),
        address: format!(
            "{}.{}.{}.{}",
            rng.gen_range(1..224u8),
            rng.gen::<u8>(),
            rng.gen::<u8>(),
            rng.gen::<u8>()
        ),
        port: rng.gen_range(1024..u16::MAX),
        protocol,
        candidate_type: "host".to_string(),
    }
}

#[test]
fn splice_never_leaves_a_udp_candidate() {
    let mut rng = thread_rng();
    let grant = RelayGrant {
        relay_host: "127.0.0.1".to_string(),
        relay_port: 9100,
    };

    for _ in 0..10_000 {
        let count = rng.gen_range(0..6);
        let candidates: Vec<IceCandidate> =
            (0..count).map(|_| random_candidate(&mut rng)).collect();

        match splice_consumer_path(&candidates, &grant) {
            Ok(spliced) => {
                assert!(spliced
                    .iter()
                    .all(|c| c.protocol != CandidateProtocol::Udp));
                assert_eq!(spliced[0].address, grant.relay_host);
                assert_eq!(spliced[0].port, grant.relay_port);

                let tcp_count = candidates
                    .iter()
                    .filter(|c| c.protocol == CandidateProtocol::Tcp)
                    .count();
                assert_eq!(spliced.len(), tcp_count);
            }
            Err(SpliceError::NoEligibleCandidate { dropped }) => {
                assert_eq!(dropped, candidates.len());
                assert!(candidates
                    .iter()
                    .all(|c| c.protocol == CandidateProtocol::Udp));
            }
        }
    }
}

#[test]
fn splice_is_deterministic_for_random_inputs() {
    let mut rng = thread_rng();
    let grant = RelayGrant {
        relay_host: "relay.example.net".to_string(),
        relay_port: 443,
    };

    for _ in 0..1_000 {
        let count = rng.gen_range(1..5);
        let candidates: Vec<IceCandidate> =
            (0..count).map(|_| random_candidate(&mut rng)).collect();
        let first = splice_consumer_path(&candidates, &grant);
        let second = splice_consumer_path(&candidates, &grant);
        assert_eq!(first, second);
    }
}
