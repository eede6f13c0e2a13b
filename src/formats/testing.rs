//! Builders for synthetic Nitro files used by the unit tests.

use super::chunk::{Tag, CHUNK_HEADER_LEN, CONTAINER_HEADER_LEN};

pub fn build_chunk(tag: Tag, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(CHUNK_HEADER_LEN + payload.len());
    out.extend_from_slice(&tag);
    out.extend_from_slice(&((CHUNK_HEADER_LEN + payload.len()) as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Header plus chunks, with the total length and chunk count filled in.
pub fn build_container(magic: Tag, chunks: &[(Tag, Vec<u8>)]) -> Vec<u8> {
    let body: Vec<u8> = chunks
        .iter()
        .flat_map(|(tag, payload)| build_chunk(*tag, payload))
        .collect();

    let mut out = Vec::with_capacity(CONTAINER_HEADER_LEN + body.len());
    out.extend_from_slice(&magic);
    out.extend_from_slice(&0xFEFFu16.to_le_bytes());
    out.extend_from_slice(&0x0100u16.to_le_bytes());
    out.extend_from_slice(&((CONTAINER_HEADER_LEN + body.len()) as u32).to_le_bytes());
    out.extend_from_slice(&(CONTAINER_HEADER_LEN as u16).to_le_bytes());
    out.extend_from_slice(&(chunks.len() as u16).to_le_bytes());
    out.extend_from_slice(&body);
    out
}
