//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use merklog::{MemoryBus, Peer, PeerConfig};
use merklog_core::{ContentHash, Message, PeerId};
use merklog_sync::{verify_mesh, ConvergenceResult, Replica, SyncConfig, SyncEvent};

/// Install a fmt subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// `n` peers sharing one recording in-process bus.
pub struct Mesh {
    bus: Arc<MemoryBus>,
    peers: Vec<Peer>,
}

impl Mesh {
    /// Create a mesh of `n` peers named `connection 0..n`.
    pub fn new(n: usize) -> Self {
        Self::with_config(n, PeerConfig::default())
    }

    pub fn with_config(n: usize, config: PeerConfig) -> Self {
        let bus = MemoryBus::shared_recording();
        let peers = (0..n)
            .map(|i| Peer::new(PeerId::from_index(i), bus.clone(), config.clone()))
            .collect();
        Self { bus, peers }
    }

    pub fn bus(&self) -> &MemoryBus {
        &self.bus
    }

    pub fn peer(&self, index: usize) -> &Peer {
        &self.peers[index]
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn roots(&self) -> Vec<Option<ContentHash>> {
        self.peers.iter().map(Peer::root_hash).collect()
    }

    pub fn convergence(&self) -> ConvergenceResult {
        verify_mesh(&self.roots())
    }

    pub fn is_converged(&self) -> bool {
        self.convergence().is_converged()
    }

    /// Have every peer re-advertise its root, in index order.
    pub fn sync_all(&self) {
        for peer in &self.peers {
            // Peers in a mesh are only shut down by the test itself
            let _ = peer.sync();
        }
    }
}

/// Delivery simulation over bare replicas.
///
/// Events in flight are delivered one at a time in a seeded random order,
/// and each delivery may leave a duplicate behind. Every replica sees every
/// event, in a shuffled order per delivery.
pub struct Simulation {
    replicas: Vec<Replica>,
    in_flight: Vec<SyncEvent>,
    rng: StdRng,
    duplicate_rate: f64,
    delivered: usize,
    clock: u32,
}

impl Simulation {
    /// Upper bound on deliveries in one `run`.
    pub const MAX_STEPS: usize = 1_000_000;

    pub fn new(n: usize, seed: u64) -> Self {
        Self::with_config(n, seed, SyncConfig::default())
    }

    pub fn with_config(n: usize, seed: u64, config: SyncConfig) -> Self {
        let replicas = (0..n)
            .map(|i| Replica::new(PeerId::from_index(i), config.clone()))
            .collect();
        Self {
            replicas,
            in_flight: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            duplicate_rate: 0.0,
            delivered: 0,
            clock: 0,
        }
    }

    /// Leave a duplicate of each delivered event with probability `rate`.
    pub fn with_duplicates(mut self, rate: f64) -> Self {
        self.duplicate_rate = rate.clamp(0.0, 0.9);
        self
    }

    pub fn replica(&mut self, index: usize) -> &mut Replica {
        &mut self.replicas[index]
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Author a message on one replica and put its root in flight.
    pub fn send(&mut self, index: usize, text: &str) -> Message {
        let message = Message::with_timestamp(
            PeerId::from_index(index),
            text,
            format!("2026-01-14T12:{:02}:{:02}Z", self.clock / 60 % 60, self.clock % 60),
        );
        self.clock += 1;

        let replica = &mut self.replicas[index];
        replica.append_local(message.clone());
        let root = replica.root_event();
        self.in_flight.push(root);
        message
    }

    /// Put an event in flight.
    pub fn inject(&mut self, event: SyncEvent) {
        self.in_flight.push(event);
    }

    /// Deliver one in-flight event. Returns false when nothing is in flight.
    pub fn step(&mut self) -> bool {
        if self.in_flight.is_empty() {
            return false;
        }

        let pick = self.rng.gen_range(0..self.in_flight.len());
        let event = if self.rng.gen_bool(self.duplicate_rate) {
            self.in_flight[pick].clone()
        } else {
            self.in_flight.swap_remove(pick)
        };

        let mut order: Vec<usize> = (0..self.replicas.len()).collect();
        order.shuffle(&mut self.rng);
        for i in order {
            let step = self.replicas[i].handle(&event);
            self.in_flight.extend(step.outbound);
        }
        self.delivered += 1;
        true
    }

    /// Deliver until nothing is in flight. Returns the number of deliveries.
    pub fn run(&mut self) -> usize {
        let mut steps = 0;
        while steps < Self::MAX_STEPS && self.step() {
            steps += 1;
        }
        steps
    }

    /// Have each replica advertise its root in turn, running to quiescence
    /// after each one.
    pub fn heal(&mut self) -> usize {
        let mut steps = self.run();
        for i in 0..self.replicas.len() {
            let root = self.replicas[i].root_event();
            self.in_flight.push(root);
            steps += self.run();
        }
        steps
    }

    pub fn roots(&mut self) -> Vec<Option<ContentHash>> {
        self.replicas.iter_mut().map(Replica::root_hash).collect()
    }

    pub fn convergence(&mut self) -> ConvergenceResult {
        verify_mesh(&self.roots())
    }

    /// Sorted leaf hashes held by one replica.
    pub fn leaf_set(&mut self, index: usize) -> Vec<ContentHash> {
        self.replicas[index].tree().leaves().to_vec()
    }
}
