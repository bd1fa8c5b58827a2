//! MeshSeq Media - Mesh file loading and decoding
//!
//! This crate handles:
//! - Decoding fetched mesh payloads into geometry resources
//! - Draco container header validation
//! - Concurrent file loading on a dedicated async runtime

pub mod decoder;
pub mod fs_loader;

pub use decoder::{DracoHeader, DracoHeaderDecoder, EncodedMesh, MeshDecoder, PassthroughDecoder};
pub use fs_loader::{FileMeshLoader, LoaderStats};
