//! rag benchmarking suite
//!
//! Benchmarks for cycle enumeration, detector mutation and detection, and
//! the JSON repository, plus the graph fixtures they share.

pub mod common;

pub use common::*;
