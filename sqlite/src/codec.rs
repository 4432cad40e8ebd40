//! Compression of the model cache blob.
//!
//! The cache blob is a DEFLATE stream. Stores written through the zlib
//! library carry the two-byte RFC 1950 header; stores written through the
//! engine's platform codec carry raw RFC 1951 data. [`inflate`] accepts both,
//! choosing by header, and caps the output size.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use serde::{Deserialize, Serialize};

/// Framing of a compressed cache blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlobFormat {
    /// RFC 1950 zlib stream.
    #[default]
    Zlib,
    /// RFC 1951 DEFLATE data without header or checksum.
    RawDeflate,
}

/// Returns `true` if `bytes` starts with a valid zlib header.
///
/// # Examples
///
/// ```
/// use store_model_sqlite::has_zlib_header;
///
/// assert!(has_zlib_header(&[0x78, 0x9c]));
/// assert!(!has_zlib_header(b"{}"));
/// ```
pub fn has_zlib_header(bytes: &[u8]) -> bool {
    let &[cmf, flg, ..] = bytes else {
        return false;
    };
    let method_is_deflate = cmf & 0x0f == 8;
    let window_ok = cmf >> 4 <= 7;
    let check_ok = (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0;
    method_is_deflate && window_ok && check_ok
}

/// Inflates a cache blob, refusing to produce more than `limit` bytes.
///
/// The input is only borrowed.
///
/// # Errors
///
/// Returns the codec's [`io::Error`] for corrupt data, or an
/// [`io::ErrorKind::InvalidData`] error when the output exceeds `limit`.
pub fn inflate(compressed: &[u8], limit: u64) -> io::Result<Vec<u8>> {
    if has_zlib_header(compressed) {
        read_limited(ZlibDecoder::new(compressed), limit)
    } else {
        read_limited(DeflateDecoder::new(compressed), limit)
    }
}

fn read_limited(reader: impl Read, limit: u64) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut out)?;
    if out.len() as u64 > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("inflated model cache exceeds {limit} bytes"),
        ));
    }
    Ok(out)
}

/// Compresses `bytes` in the given framing.
///
/// # Errors
///
/// Returns an [`io::Error`] if the encoder fails.
pub fn deflate(bytes: &[u8], format: BlobFormat) -> io::Result<Vec<u8>> {
    match format {
        BlobFormat::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(bytes)?;
            encoder.finish()
        }
        BlobFormat::RawDeflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(bytes)?;
            encoder.finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = b"{\"archiver\":\"StoreModelArchiver\",\"version\":1,\"class\":\"ObjectModel\",\"root\":null}";

    #[test]
    fn test_zlib_output_has_header() {
        let compressed = deflate(PAYLOAD, BlobFormat::Zlib).unwrap();
        assert!(has_zlib_header(&compressed));
        assert_eq!(inflate(&compressed, 1024).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_raw_deflate_is_accepted() {
        let compressed = deflate(PAYLOAD, BlobFormat::RawDeflate).unwrap();
        assert_eq!(inflate(&compressed, 1024).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_corrupt_stream_fails() {
        // Valid zlib header followed by a block with the reserved type.
        let corrupt: [u8; 6] = [0x78, 0x9c, 0xff, 0xff, 0xff, 0xff];
        assert!(inflate(&corrupt, 1024).is_err());
    }

    #[test]
    fn test_limit_is_enforced() {
        let big = vec![0u8; 64 * 1024];
        let compressed = deflate(&big, BlobFormat::Zlib).unwrap();

        let err = inflate(&compressed, 1024).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        assert_eq!(inflate(&compressed, big.len() as u64).unwrap().len(), big.len());
    }

    #[test]
    fn test_header_detection() {
        assert!(!has_zlib_header(&[]));
        assert!(!has_zlib_header(&[0x78]));
        // Right method, wrong check bits.
        assert!(!has_zlib_header(&[0x78, 0x00]));
        assert!(has_zlib_header(&[0x78, 0x01]));
        assert!(has_zlib_header(&[0x78, 0xda]));
    }
}
