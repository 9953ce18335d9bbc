//! # Merklog Testkit
//!
//! Testing utilities for Merklog.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known canonical encodings for cross-platform verification
//! - **Generators**: Proptest strategies for messages and logs
//! - **Fixtures**: A [`Mesh`] of peers on one bus, and a seeded [`Simulation`]
//!   that delivers events shuffled and duplicated
//!
//! ## Golden Vectors
//!
//! ```rust
//! use merklog_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! assert!(!all_vectors().is_empty());
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use merklog_testkit::generators::message_set;
//!
//! proptest! {
//!     #[test]
//!     fn root_is_deterministic(messages in message_set(16)) {
//!         let a = merklog_core::compute_root(&messages);
//!         let b = merklog_core::compute_root(&messages);
//!         prop_assert_eq!(a.root(), b.root());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use merklog_testkit::Mesh;
//!
//! let mesh = Mesh::new(3);
//! mesh.peer(0).send_message("hello").unwrap();
//! assert_eq!(mesh.peer(2).messages().len(), 1);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_tracing, Mesh, Simulation};
pub use generators::{message, message_set, MessageParams};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
