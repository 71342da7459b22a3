//! # Core Models Module
//!
//! Fundamental data structures representing the simulation state.
//!
//! - [`particle`] - point particles with charge, size and species identity
//! - [`species`] - the explicit per-type parameter registry (there is no
//!   global species table; the registry is injected where needed)
//! - [`group`] - contiguous particle ranges forming molecules or subsets
//! - [`space`] - the particle collection with its trial mirror and geometry

pub mod group;
pub mod particle;
pub mod space;
pub mod species;
