use roomlink_client::{LinkState, MeshEvent, PeerId};

use crate::integration::{create_test_peer, init_tracing};
use crate::utils::{answer_msg, bye_msg, identify, join_msg, wait_for_event};

#[tokio::test]
async fn test_peer_leaves_others_stay() {
    init_tracing();

    let mut peer = create_test_peer();
    let y = PeerId::from("y");
    let z = PeerId::from("z");

    peer.handle.mark_local_media_ready().await.unwrap();
    identify(&peer.handle, "x").await.unwrap();
    for id in ["y", "z"] {
        peer.handle.submit_signal(join_msg(id)).await.unwrap();
        peer.handle
            .submit_signal(answer_msg(id, "x", "v=0"))
            .await
            .unwrap();
    }

    let snapshot = peer.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.link_state(&y), Some(LinkState::Stable));
    assert_eq!(snapshot.link_state(&z), Some(LinkState::Stable));

    peer.handle.submit_signal(bye_msg("y")).await.unwrap();

    let event = wait_for_event(&mut peer.events, |e| {
        matches!(e, MeshEvent::PeerLeft { .. })
    })
    .await
    .unwrap();
    assert_eq!(event, MeshEvent::PeerLeft { peer: y.clone() });
    assert!(peer.engine.is_closed(&y));
    assert!(!peer.engine.is_closed(&z));

    let snapshot = peer.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.link_state(&y), None);
    assert_eq!(snapshot.link_state(&z), Some(LinkState::Stable));

    // A late answer from the departed peer finds no link.
    peer.handle
        .submit_signal(answer_msg("y", "x", "v=0"))
        .await
        .unwrap();
    let snapshot = peer.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.links.len(), 1);
}

#[tokio::test]
async fn test_bye_from_unknown_peer_changes_nothing() {
    init_tracing();

    let mut peer = create_test_peer();
    let y = PeerId::from("y");

    peer.handle.mark_local_media_ready().await.unwrap();
    identify(&peer.handle, "x").await.unwrap();
    peer.handle.submit_signal(join_msg("y")).await.unwrap();

    peer.handle.submit_signal(bye_msg("q")).await.unwrap();

    let snapshot = peer.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.link_state(&y), Some(LinkState::HaveLocalOffer));
    assert!(
        !std::iter::from_fn(|| peer.events.try_recv().ok())
            .any(|e| matches!(e, MeshEvent::PeerLeft { .. }))
    );
}
