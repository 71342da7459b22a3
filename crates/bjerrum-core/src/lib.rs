//! # Bjerrum Core Library
//!
//! A Metropolis Monte Carlo framework for statistical-mechanical modeling of
//! charged and colloidal particle systems (proteins, salts, colloids) in
//! implicit solvent.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to keep
//! the hot energy-evaluation path free of state and the Markov-chain
//! mechanics in one place.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Space`,
//!   `Particle`, `SpeciesRegistry`), the simulation-cell geometry with its
//!   minimum-image metric, and the algebra of composable pair-potential
//!   kernels evaluated billions of times per run.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer owns the Monte
//!   Carlo machinery: the Hamiltonian with its group-wise energy
//!   decomposition, the trial-move state machine with Metropolis
//!   acceptance, energy-drift tracking and run configuration.
//!
//! - **[`workflows`]: The Public API.** The highest-level layer ties the
//!   `engine` and `core` together to execute complete simulation runs from
//!   a configuration file, with progress reporting and a final statistics
//!   report.

pub mod core;
pub mod engine;
pub mod workflows;
