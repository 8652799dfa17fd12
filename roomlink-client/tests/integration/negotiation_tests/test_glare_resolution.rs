use roomlink_client::{LinkState, MeshEvent, PeerId};

use crate::integration::{create_test_peer, init_tracing};
use crate::utils::{expect_no_signal, identify, join_msg, wait_for_event, wait_for_signal};

/// Both sides offer at once. "b" sorts after "a", so "b" is polite: it
/// rolls back and answers, while "a" keeps its own offer.
#[tokio::test]
async fn test_simultaneous_offers_resolve_to_one_negotiation() {
    init_tracing();

    let mut a = create_test_peer();
    let mut b = create_test_peer();
    let a_id = PeerId::from("a");
    let b_id = PeerId::from("b");

    for (peer, id) in [(&a, "a"), (&b, "b")] {
        peer.handle.mark_local_media_ready().await.unwrap();
        identify(&peer.handle, id).await.unwrap();
    }

    a.handle.submit_signal(join_msg("b")).await.unwrap();
    b.handle.submit_signal(join_msg("a")).await.unwrap();

    let offer_from_a = wait_for_signal(&mut a.signal_rx, "offer").await.unwrap();
    let offer_from_b = wait_for_signal(&mut b.signal_rx, "offer").await.unwrap();

    a.handle.submit_signal(offer_from_b).await.unwrap();
    b.handle.submit_signal(offer_from_a).await.unwrap();

    let answer_from_b = wait_for_signal(&mut b.signal_rx, "answer")
        .await
        .expect("Polite side did not answer");
    assert_eq!(answer_from_b.target(), Some(&a_id));
    expect_no_signal(&mut a.signal_rx, "answer")
        .await
        .expect("Impolite side must not answer");

    assert_eq!(b.engine.rollbacks(&a_id), 1);
    assert_eq!(a.engine.rollbacks(&b_id), 0);

    let snapshot = a.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.link_state(&b_id), Some(LinkState::HaveLocalOffer));

    a.handle.submit_signal(answer_from_b).await.unwrap();
    wait_for_event(&mut a.events, |e| {
        *e == MeshEvent::LinkStable { peer: b_id.clone() }
    })
    .await
    .unwrap();

    let a_view = a.handle.snapshot().await.unwrap();
    let b_view = b.handle.snapshot().await.unwrap();
    assert_eq!(a_view.link_state(&b_id), Some(LinkState::Stable));
    assert_eq!(b_view.link_state(&a_id), Some(LinkState::Stable));
    assert_eq!(a.signaling.count("answer").await, 0);
    assert_eq!(b.signaling.count("answer").await, 1);
}
