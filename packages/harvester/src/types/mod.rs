//! Core data types for the harvester.

pub mod config;
pub mod record;
