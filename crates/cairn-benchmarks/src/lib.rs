//! Cairn benchmarking suite
//!
//! Benchmarks for content hashing and for whole archive runs through the
//! dedupe, hash, lookup and upload stages.

pub mod common;

pub use common::*;
