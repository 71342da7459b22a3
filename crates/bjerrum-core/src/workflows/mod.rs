//! # Workflows Module
//!
//! The public, user-facing layer. Workflows wire the `core` and `engine`
//! layers together into complete procedures: assembling a simulation from a
//! run configuration and driving a full Markov chain with progress
//! reporting.

pub mod simulate;
