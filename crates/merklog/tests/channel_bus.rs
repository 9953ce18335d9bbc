//! Peers on the Tokio broadcast bus.

use std::sync::Arc;
use std::time::Duration;

use merklog::{ChannelBus, Peer, PeerConfig, PeerId};
use merklog::sync::verify_mesh;
use merklog_testkit::init_tracing;

async fn wait_converged(peers: &[Peer], expected: usize) -> bool {
    for _ in 0..200 {
        let roots: Vec<_> = peers.iter().map(Peer::root_hash).collect();
        let full = peers.iter().all(|p| p.messages().len() == expected);
        if full && verify_mesh(&roots).is_converged() {
            return true;
        }
        // Re-drive anything a stale query left behind
        for peer in peers {
            peer.sync().unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn peers_converge_over_channel_bus() {
    init_tracing();
    let bus = Arc::new(ChannelBus::new(ChannelBus::DEFAULT_CAPACITY).unwrap());
    let peers: Vec<_> = (0..3)
        .map(|i| Peer::new(PeerId::from_index(i), bus.clone(), PeerConfig::default()))
        .collect();

    for (i, peer) in peers.iter().enumerate() {
        peer.send_message(format!("hello from {}", i)).unwrap();
    }

    assert!(wait_converged(&peers, 3).await);
}

#[tokio::test]
async fn shutdown_removes_channel_subscriber() {
    let bus = Arc::new(ChannelBus::new(16).unwrap());
    let a = Peer::new(PeerId::from_index(0), bus.clone(), PeerConfig::default());
    let b = Peer::new(PeerId::from_index(1), bus.clone(), PeerConfig::default());
    assert_eq!(bus.subscriber_count(), 2);

    a.shutdown();
    assert_eq!(bus.subscriber_count(), 1);

    b.send_message("only b").unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(a.messages().is_empty());
}
