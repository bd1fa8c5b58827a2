//! Integration test crate for MeshSeq.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every meshseq crate to verify they work together.

#[cfg(test)]
mod config;

#[cfg(test)]
mod playback;
