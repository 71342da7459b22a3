//! # Pair Potential Module
//!
//! Composable pair-potential kernels evaluated billions of times per run.
//!
//! ## Overview
//!
//! Every kernel computes the interaction energy in kT between two particles
//! at a given squared distance. Kernels are plain values; algebraic
//! composition builds new potentials from existing ones:
//!
//! ```
//! use bjerrum::core::potential::pair::{Coulomb, HardSphere, LennardJones, PairPotential};
//!
//! let nonbonded = PairPotential::from(Coulomb::new(7.1))
//!     + PairPotential::from(LennardJones::new(0.2));
//! let primitive_model = PairPotential::from(Coulomb::new(7.1))
//!     + PairPotential::from(HardSphere);
//! ```
//!
//! Subtraction excludes, for example, nonbonded interactions between bonded
//! pairs; scaling rescales a term. Composition is purely additive in energy
//! and force, and combined potentials propagate the wider of their members'
//! cutoff tables.
//!
//! ## Key Components
//!
//! - [`kernels`] - the bare energy functions
//! - [`pair`] - kernel parameter structs and the [`pair::PairPotential`]
//!   composition tree
//! - [`mixing`] - Lorentz-Berthelot (and custom) mixing into pair tables
//! - [`pair_matrix`] - symmetric per-species-pair lookup tables
//! - [`dispatch`] - species-pair dispatch with a default fallback
//! - [`table`] - potentials interpolated from tabulated data

pub mod dispatch;
pub mod kernels;
pub mod mixing;
pub mod pair;
pub mod pair_matrix;
pub mod table;
