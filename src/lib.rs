//! One-shot data migrations for the Everyone Santa database.
//!
//! Each migration lives in its own module and is driven by a binary under
//! `src/bin/`. The binaries handle environment loading and operator output;
//! the modules here hold the logic and are tested against an in-memory
//! storage fake.

pub mod config;
pub mod friend_graph;
pub mod invites;
pub mod privacy;
pub mod storage;
pub mod types;
