//! Streaming gzip for backup documents.
//!
//! Both directions work chunk by chunk over an in-memory `Vec<u8>` whose
//! contents are drained after every call, so memory stays bounded by one
//! page regardless of document size.

use std::io::Write;

use bytes::Bytes;
use flate2::write::{GzDecoder, GzEncoder};
use flate2::Compression;

use tablekeep_core::backup::DocumentError;

fn compression_error(err: std::io::Error) -> DocumentError {
    DocumentError::Compression(err.to_string())
}

/// Optional gzip on the write path.
pub enum Compressor {
    Plain,
    Gzip(GzEncoder<Vec<u8>>),
}

impl Compressor {
    pub fn new(compress: bool) -> Self {
        if compress {
            Compressor::Gzip(GzEncoder::new(Vec::new(), Compression::default()))
        } else {
            Compressor::Plain
        }
    }

    /// Feeds `data` and returns whatever output is ready. May be empty.
    pub fn compress(&mut self, data: Bytes) -> Result<Bytes, DocumentError> {
        match self {
            Compressor::Plain => Ok(data),
            Compressor::Gzip(encoder) => {
                encoder.write_all(&data).map_err(compression_error)?;
                Ok(Bytes::from(std::mem::take(encoder.get_mut())))
            }
        }
    }

    /// Flushes the trailer. Returns the remaining output.
    pub fn finish(self) -> Result<Bytes, DocumentError> {
        match self {
            Compressor::Plain => Ok(Bytes::new()),
            Compressor::Gzip(encoder) => encoder.finish().map(Bytes::from).map_err(compression_error),
        }
    }
}

/// Optional gunzip on the read path.
pub enum Decompressor {
    Plain,
    Gzip(GzDecoder<Vec<u8>>),
}

impl Decompressor {
    pub fn new(compressed: bool) -> Self {
        if compressed {
            Decompressor::Gzip(GzDecoder::new(Vec::new()))
        } else {
            Decompressor::Plain
        }
    }

    /// Feeds a raw chunk and returns the decoded bytes available so far.
    pub fn decompress(&mut self, chunk: &[u8]) -> Result<Vec<u8>, DocumentError> {
        match self {
            Decompressor::Plain => Ok(chunk.to_vec()),
            Decompressor::Gzip(decoder) => {
                decoder.write_all(chunk).map_err(compression_error)?;
                Ok(std::mem::take(decoder.get_mut()))
            }
        }
    }

    /// Verifies the stream ended cleanly and returns any remaining bytes.
    pub fn finish(self) -> Result<Vec<u8>, DocumentError> {
        match self {
            Decompressor::Plain => Ok(Vec::new()),
            Decompressor::Gzip(decoder) => decoder.finish().map_err(compression_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress_all(compress: bool, chunks: &[&[u8]]) -> Vec<u8> {
        let mut compressor = Compressor::new(compress);
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend_from_slice(&compressor.compress(Bytes::copy_from_slice(chunk)).unwrap());
        }
        out.extend_from_slice(&compressor.finish().unwrap());
        out
    }

    fn decompress_all(compressed: bool, data: &[u8], chunk_size: usize) -> Vec<u8> {
        let mut decompressor = Decompressor::new(compressed);
        let mut out = Vec::new();
        for chunk in data.chunks(chunk_size) {
            out.extend(decompressor.decompress(chunk).unwrap());
        }
        out.extend(decompressor.finish().unwrap());
        out
    }

    #[test]
    fn test_gzip_output_has_magic_bytes() {
        let out = compress_all(true, &[b"[\n", b"]\n"]);
        assert_eq!(&out[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_plain_passthrough() {
        let out = compress_all(false, &[b"[\n", b"]\n"]);
        assert_eq!(out, b"[\n]\n");
        assert_eq!(decompress_all(false, &out, 1), b"[\n]\n");
    }

    #[test]
    fn test_gzip_chunked_decode() {
        let body: Vec<u8> = (0..2000).flat_map(|i| format!("line {i}\n").into_bytes()).collect();
        let compressed = compress_all(true, &[&body[..500], &body[500..]]);
        assert!(compressed.len() < body.len());
        for chunk_size in [1, 17, 4096] {
            assert_eq!(decompress_all(true, &compressed, chunk_size), body);
        }
    }

    #[test]
    fn test_corrupt_gzip_fails() {
        let mut decompressor = Decompressor::new(true);
        let result = decompressor
            .decompress(b"definitely not gzip")
            .and_then(|_| decompressor.finish());
        assert!(matches!(result, Err(DocumentError::Compression(_))));
    }
}
