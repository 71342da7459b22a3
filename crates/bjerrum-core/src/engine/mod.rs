//! # Engine Module
//!
//! The stateful Monte Carlo layer: it owns the Markov-chain mechanics that
//! the stateless `core` layer feeds.
//!
//! ## Architecture
//!
//! - **Energy aggregation** ([`hamiltonian`]) - pairwise plus external
//!   energy sums over particles, groups and the whole system
//! - **Moves** ([`moves`]) - trial generation, Metropolis acceptance and
//!   per-move statistics
//! - **Drift tracking** ([`drift`]) - incremental versus recomputed energy
//!   consistency checks
//! - **Configuration** ([`config`]) - typed run files with defaults and
//!   validation
//! - **Progress** ([`progress`]) - callback-based run monitoring
//! - **Errors** ([`error`]) - engine-level error taxonomy
//!
//! Moves are applied strictly sequentially; the only parallelism is the
//! read-only decomposition of a single energy evaluation inside the
//! Hamiltonian.

pub mod config;
pub mod drift;
pub mod error;
pub mod hamiltonian;
pub mod moves;
pub mod progress;
