use roomlink_client::{LinkState, MeshEvent, PeerId, SignalMessage, SignalingState};
use roomlink_core::SdpKind;

use crate::integration::{create_test_peer, init_tracing};
use crate::utils::{answer_msg, identify, join_msg, offer_msg, wait_for_event, wait_for_signal};

#[tokio::test]
async fn test_join_triggers_offer_and_answer_completes() {
    init_tracing();

    let mut peer = create_test_peer();
    let y = PeerId::from("y");

    peer.handle.mark_local_media_ready().await.unwrap();
    identify(&peer.handle, "x").await.unwrap();
    peer.handle.submit_signal(join_msg("y")).await.unwrap();

    let offer = wait_for_signal(&mut peer.signal_rx, "offer").await.unwrap();
    match offer {
        SignalMessage::Offer {
            offer,
            target,
            sender,
        } => {
            assert_eq!(offer.kind, SdpKind::Offer);
            assert_eq!(target, y);
            assert_eq!(sender, PeerId::from("x"));
        }
        other => panic!("Expected offer, got {:?}", other),
    }

    let snapshot = peer.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.link_state(&y), Some(LinkState::HaveLocalOffer));

    peer.handle
        .submit_signal(answer_msg("y", "x", "v=0"))
        .await
        .unwrap();

    let event = wait_for_event(&mut peer.events, |e| {
        matches!(e, MeshEvent::LinkStable { .. })
    })
    .await
    .unwrap();
    assert_eq!(event, MeshEvent::LinkStable { peer: y.clone() });

    let snapshot = peer.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.link_state(&y), Some(LinkState::Stable));
    assert_eq!(peer.engine.state_of(&y), Some(SignalingState::Stable));
}

#[tokio::test]
async fn test_duplicate_answer_is_ignored() {
    init_tracing();

    let mut peer = create_test_peer();
    let y = PeerId::from("y");

    peer.handle.mark_local_media_ready().await.unwrap();
    identify(&peer.handle, "x").await.unwrap();
    peer.handle.submit_signal(join_msg("y")).await.unwrap();
    wait_for_signal(&mut peer.signal_rx, "offer").await.unwrap();

    peer.handle
        .submit_signal(answer_msg("y", "x", "v=0"))
        .await
        .unwrap();
    peer.handle
        .submit_signal(answer_msg("y", "x", "v=0"))
        .await
        .unwrap();

    let snapshot = peer.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.link_state(&y), Some(LinkState::Stable));
    assert_eq!(peer.engine.remote_descriptions(&y).len(), 1);
    assert_eq!(peer.engine.state_of(&y), Some(SignalingState::Stable));
}

#[tokio::test]
async fn test_inbound_offer_is_answered() {
    init_tracing();

    let mut peer = create_test_peer();
    let y = PeerId::from("y");

    peer.handle.mark_local_media_ready().await.unwrap();
    identify(&peer.handle, "x").await.unwrap();
    peer.handle
        .submit_signal(offer_msg("y", "x", "v=0"))
        .await
        .unwrap();

    let answer = wait_for_signal(&mut peer.signal_rx, "answer").await.unwrap();
    match answer {
        SignalMessage::Answer {
            answer,
            target,
            sender,
        } => {
            assert_eq!(answer.kind, SdpKind::Answer);
            assert_eq!(target, y);
            assert_eq!(sender, PeerId::from("x"));
        }
        other => panic!("Expected answer, got {:?}", other),
    }

    wait_for_event(&mut peer.events, |e| {
        matches!(e, MeshEvent::LinkStable { .. })
    })
    .await
    .unwrap();
    let snapshot = peer.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.link_state(&y), Some(LinkState::Stable));
}

#[tokio::test]
async fn test_offer_on_stable_link_is_renegotiated() {
    init_tracing();

    let mut peer = create_test_peer();
    let y = PeerId::from("y");

    peer.handle.mark_local_media_ready().await.unwrap();
    identify(&peer.handle, "x").await.unwrap();
    peer.handle
        .submit_signal(offer_msg("y", "x", "v=0"))
        .await
        .unwrap();
    wait_for_signal(&mut peer.signal_rx, "answer").await.unwrap();

    peer.handle
        .submit_signal(offer_msg("y", "x", "v=1"))
        .await
        .unwrap();
    wait_for_signal(&mut peer.signal_rx, "answer").await.unwrap();

    assert_eq!(peer.signaling.answers_to(&y).await.len(), 2);
    assert_eq!(peer.engine.rollbacks(&y), 0);
    assert_eq!(peer.engine.sessions_created(), 1);
}
