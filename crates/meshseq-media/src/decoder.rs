//! Mesh payload decoding.

use meshseq_core::{FrameIndex, MeshSeqError, Result};
use meshseq_stream::GeometryResource;

/// Turns the bytes of one fetched mesh file into a geometry resource.
///
/// Called from loader worker threads.
pub trait MeshDecoder: Send + Sync + 'static {
    type Mesh: GeometryResource + Send + 'static;

    fn decode(&self, frame: FrameIndex, bytes: Vec<u8>) -> Result<Self::Mesh>;
}

/// Fixed header at the start of every Draco file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DracoHeader {
    pub version_major: u8,
    pub version_minor: u8,
    /// 0 = point cloud, 1 = triangular mesh.
    pub encoder_type: u8,
    /// 0 = sequential, 1 = edgebreaker.
    pub encoder_method: u8,
    pub flags: u16,
}

impl DracoHeader {
    const MAGIC: &'static [u8; 5] = b"DRACO";
    pub const LEN: usize = 11;

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::LEN {
            return Err(MeshSeqError::Decode(format!(
                "Draco payload too short: {} bytes",
                bytes.len()
            )));
        }
        if &bytes[..5] != Self::MAGIC {
            return Err(MeshSeqError::Decode("missing DRACO magic".to_string()));
        }
        Ok(Self {
            version_major: bytes[5],
            version_minor: bytes[6],
            encoder_type: bytes[7],
            encoder_method: bytes[8],
            flags: u16::from_le_bytes([bytes[9], bytes[10]]),
        })
    }

    pub fn is_triangular_mesh(&self) -> bool {
        self.encoder_type == 1
    }
}

/// Encoded mesh bytes held until rendered.
///
/// Stands in for a GPU geometry: `release` drops the payload, after which
/// the mesh reports no size.
#[derive(Debug, Clone)]
pub struct EncodedMesh {
    frame: FrameIndex,
    header: Option<DracoHeader>,
    data: Vec<u8>,
    released: bool,
}

impl EncodedMesh {
    pub fn new(frame: FrameIndex, data: Vec<u8>) -> Self {
        Self {
            frame,
            header: None,
            data,
            released: false,
        }
    }

    pub fn frame(&self) -> FrameIndex {
        self.frame
    }

    pub fn header(&self) -> Option<&DracoHeader> {
        self.header.as_ref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl GeometryResource for EncodedMesh {
    fn release(&mut self) {
        self.data = Vec::new();
        self.released = true;
    }

    fn byte_size(&self) -> Option<u64> {
        (!self.released).then_some(self.data.len() as u64)
    }
}

/// Keeps the payload as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecoder;

impl MeshDecoder for PassthroughDecoder {
    type Mesh = EncodedMesh;

    fn decode(&self, frame: FrameIndex, bytes: Vec<u8>) -> Result<EncodedMesh> {
        Ok(EncodedMesh::new(frame, bytes))
    }
}

/// Rejects payloads that are not Draco triangular meshes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DracoHeaderDecoder;

impl MeshDecoder for DracoHeaderDecoder {
    type Mesh = EncodedMesh;

    fn decode(&self, frame: FrameIndex, bytes: Vec<u8>) -> Result<EncodedMesh> {
        let header = DracoHeader::parse(&bytes)?;
        if !header.is_triangular_mesh() {
            return Err(MeshSeqError::Decode(format!(
                "frame {} is a point cloud, expected a triangular mesh",
                frame
            )));
        }
        let mut mesh = EncodedMesh::new(frame, bytes);
        mesh.header = Some(header);
        Ok(mesh)
    }
}

#[cfg(test)]
pub(crate) fn draco_bytes(encoder_type: u8, body: &[u8]) -> Vec<u8> {
    let mut bytes = b"DRACO".to_vec();
    bytes.extend_from_slice(&[2, 2, encoder_type, 1, 0, 0]);
    bytes.extend_from_slice(body);
    bytes
}
