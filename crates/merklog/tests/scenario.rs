//! Event-level traces of small meshes over the in-process bus.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use merklog::sync::{Bus, Channel, SyncEvent};
use merklog::{MemoryBus, Message, Peer, PeerConfig, PeerId, SyncConfig};
use merklog_testkit::{init_tracing, Mesh};

#[test]
fn empty_peer_pulls_single_message() {
    init_tracing();
    let mesh = Mesh::new(2);
    let (a, b) = (mesh.peer(0), mesh.peer(1));

    let hi = b.send_message("hi").unwrap();
    let h = hi.compute_hash();

    assert_eq!(
        mesh.bus().history(),
        vec![
            SyncEvent::Root(Some(h)),
            SyncEvent::Query(h),
            SyncEvent::Message(hi.clone()),
        ]
    );
    assert_eq!(a.messages().to_vec(), vec![hi]);
    assert_eq!(a.root_hash(), b.root_hash());
}

#[test]
fn own_root_triggers_no_query() {
    let mesh = Mesh::new(1);
    mesh.peer(0).send_message("alone").unwrap();

    assert!(mesh.bus().history_on(Channel::Query).is_empty());
    mesh.peer(0).sync().unwrap();
    assert!(mesh.bus().history_on(Channel::Query).is_empty());
}

#[test]
fn empty_roots_are_never_queried() {
    let mesh = Mesh::new(3);
    mesh.sync_all();

    assert_eq!(mesh.bus().history(), vec![SyncEvent::Root(None); 3]);
    assert!(mesh.is_converged());
}

#[test]
fn larger_logs_walk_down_nodes() {
    let mesh = Mesh::new(2);
    for i in 0..4 {
        mesh.peer(0).send_message(format!("m{}", i)).unwrap();
    }
    mesh.bus().clear_history();

    // Peer 1 already holds everything, so a fresh message travels alone
    mesh.peer(0).send_message("m4").unwrap();
    let history = mesh.bus().history();

    assert!(history.iter().any(|e| matches!(e, SyncEvent::Node(_))));
    let messages: Vec<_> = mesh
        .bus()
        .history_on(Channel::Message)
        .into_iter()
        .map(|e| match e {
            SyncEvent::Message(m) => m.text,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(messages, vec!["m4"]);
    assert!(mesh.is_converged());
}

#[test]
fn single_send_traffic_stays_linear_in_log_size() {
    let mesh = Mesh::new(2);
    for i in 0..16 {
        mesh.peer(0).send_message(format!("m{:02}", i)).unwrap();
    }
    mesh.bus().clear_history();

    mesh.peer(0).send_message("m16").unwrap();
    let history = mesh.bus().history();

    // One root, then at most a query and a reply per tree node
    assert!(history.len() <= 2 * 16 + 3, "{} events", history.len());
    assert_eq!(mesh.bus().history_on(Channel::Message).len(), 1);
    assert_eq!(mesh.bus().history_on(Channel::Root).len(), 1);
    assert!(mesh.is_converged());
}

#[test]
fn long_running_bus_retains_no_events() {
    let bus = MemoryBus::shared();
    let a = Peer::new(PeerId::from_index(0), bus.clone(), PeerConfig::default());
    let b = Peer::new(PeerId::from_index(1), bus.clone(), PeerConfig::default());

    for i in 0..200 {
        a.send_message(format!("m{}", i)).unwrap();
    }

    assert_eq!(b.messages().len(), 200);
    assert!(bus.delivered() > 200);
    assert!(bus.history().is_empty());
}

#[test]
fn duplicate_message_delivery_is_ignored() {
    let mesh = Mesh::new(1);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    mesh.peer(0).on_log_changed(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let m = Message::with_timestamp(PeerId::new("elsewhere"), "x", "2026-01-14T12:00:00Z");
    mesh.bus().publish(SyncEvent::Message(m.clone()));
    mesh.bus().publish(SyncEvent::Message(m));

    assert_eq!(mesh.peer(0).messages().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unknown_query_is_ignored() {
    let mesh = Mesh::new(2);
    mesh.peer(0).send_message("a").unwrap();
    mesh.bus().clear_history();

    let unknown = Message::with_timestamp(PeerId::new("nobody"), "?", "2026-01-14T12:00:00Z");
    mesh.bus().publish(SyncEvent::Query(unknown.compute_hash()));
    assert_eq!(mesh.bus().history().len(), 1);
}

#[test]
fn listener_snapshots_follow_arrival_order() {
    let mesh = Mesh::new(2);
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    mesh.peer(0).on_log_changed(move |snapshot| {
        let texts: Vec<_> = snapshot.iter().map(|m| m.text.clone()).collect();
        sink.lock().unwrap().push(texts);
    });

    mesh.peer(1).send_message("first").unwrap();
    mesh.peer(0).send_message("second").unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![vec!["first".to_string()], vec!["first".to_string(), "second".to_string()]]
    );
}

#[test]
fn listener_may_send_from_inside_delivery() {
    let shared = MemoryBus::shared();
    let a = Peer::new(PeerId::from_index(0), shared.clone(), PeerConfig::default());
    let b = Arc::new(Peer::new(PeerId::from_index(1), shared.clone(), PeerConfig::default()));

    let responder: Weak<Peer> = Arc::downgrade(&b);
    b.on_log_changed(move |snapshot| {
        let Some(peer) = responder.upgrade() else { return };
        if let Some(last) = snapshot.last() {
            if last.author != *peer.id() {
                peer.send_message(format!("ack {}", last.text)).unwrap();
            }
        }
    });

    a.send_message("ping").unwrap();

    let texts: Vec<_> = a.messages().iter().map(|m| m.text.clone()).collect();
    assert_eq!(texts, vec!["ping", "ack ping"]);
    assert_eq!(a.root_hash(), b.root_hash());
}

#[test]
fn late_joiner_waits_without_rebroadcast() {
    let bus = MemoryBus::shared();
    let a = Peer::new(PeerId::from_index(0), bus.clone(), PeerConfig::default());
    let b = Peer::new(PeerId::from_index(1), bus.clone(), PeerConfig::default());
    a.send_message("a1").unwrap();
    b.send_message("b1").unwrap();

    let c = Peer::new(PeerId::from_index(2), bus.clone(), PeerConfig::default());
    c.send_message("c1").unwrap();

    // A and B absorbed c1 through gossip and stayed quiet
    assert_eq!(a.messages().len(), 3);
    assert_eq!(b.messages().len(), 3);
    assert_eq!(c.messages().len(), 1);

    // Any send from an up-to-date peer heals it
    a.sync().unwrap();
    assert_eq!(c.messages().len(), 3);
    assert_eq!(c.root_hash(), a.root_hash());
}

#[test]
fn late_joiner_catches_up_with_rebroadcast() {
    let config = PeerConfig {
        sync: SyncConfig {
            rebroadcast_on_gossip: true,
        },
    };
    let bus = MemoryBus::shared();
    let a = Peer::new(PeerId::from_index(0), bus.clone(), config.clone());
    let b = Peer::new(PeerId::from_index(1), bus.clone(), config.clone());
    a.send_message("a1").unwrap();
    b.send_message("b1").unwrap();

    let c = Peer::new(PeerId::from_index(2), bus.clone(), config);
    c.send_message("c1").unwrap();

    assert_eq!(c.messages().len(), 3);
    assert_eq!(a.root_hash(), c.root_hash());
    assert_eq!(b.root_hash(), c.root_hash());
}

#[test]
fn shut_down_peer_stops_listening() {
    let mesh = Mesh::new(2);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    mesh.peer(0).on_log_changed(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    mesh.peer(0).shutdown();
    mesh.peer(1).send_message("after").unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(mesh.peer(0).messages().is_empty());
    assert_eq!(mesh.bus().subscriber_count(), 1);
}
