//! Core trait abstractions for the harvester.
//!
//! These traits define the seams where providers, the inference engine and
//! storage plug in.

pub mod classifier;
pub mod source;
pub mod store;
pub mod transport;
