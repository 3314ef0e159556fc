//! The TPI Stream (stream index 2; spec.md §3, §4.4, C6).
//!
//! This module owns only the stream-level framing (the fixed header, the record-bytes slice); the
//! leaf records themselves are decoded into the [`crate::types::TypeGraph`].

use crate::error::{PdbError, PdbResult};
use crate::types::{TypeGraph, TypeStreamHeader};

/// Parses a TPI (or IPI) stream's contents: the fixed header, followed by the length-prefixed
/// leaf records (spec.md §4.4: "header giving first type index and one-past-last; followed by
/// variable-length leaf records").
pub fn parse_type_stream(data: &[u8]) -> PdbResult<TypeGraph> {
    if data.is_empty() {
        // An absent/empty TPI stream yields an empty graph, not an error (spec.md §8 scenario 1:
        // "TPI empty... no errors").
        let header = TypeStreamHeader {
            version: zerocopy::byteorder::U32::new(0),
            header_size: zerocopy::byteorder::U32::new(0),
            type_index_begin: zerocopy::byteorder::U32::new(0x1000),
            type_index_end: zerocopy::byteorder::U32::new(0x1000),
            type_record_bytes: zerocopy::byteorder::U32::new(0),
            hash_stream_index: zerocopy::byteorder::U16::new(0xffff),
            hash_aux_stream_index: zerocopy::byteorder::U16::new(0xffff),
            hash_key_size: zerocopy::byteorder::U32::new(0),
            num_hash_buckets: zerocopy::byteorder::U32::new(0),
            hash_value_buffer_offset: zerocopy::byteorder::U32::new(0),
            hash_value_buffer_length: zerocopy::byteorder::U32::new(0),
            index_offset_buffer_offset: zerocopy::byteorder::U32::new(0),
            index_offset_buffer_length: zerocopy::byteorder::U32::new(0),
            hash_adj_buffer_offset: zerocopy::byteorder::U32::new(0),
            hash_adj_buffer_length: zerocopy::byteorder::U32::new(0),
        };
        return Ok(TypeGraph::parse(&header, &[]));
    }

    let header_size = std::mem::size_of::<TypeStreamHeader>();
    if data.len() < header_size {
        return Err(PdbError::BadStream(
            crate::stream_index::Stream::TPI.into(),
            crate::error::StreamErrorCause::BadLeaf,
        ));
    }

    let (header, _) = TypeStreamHeader::ref_from_prefix(data).map_err(|_| {
        PdbError::BadStream(
            crate::stream_index::Stream::TPI.into(),
            crate::error::StreamErrorCause::BadLeaf,
        )
    })?;

    let record_bytes = &data[header_size..];
    Ok(TypeGraph::parse(header, record_bytes))
}

use zerocopy::FromBytes;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stream_yields_empty_graph() {
        let graph = parse_type_stream(&[]).unwrap();
        assert!(graph.is_empty());
    }
}
