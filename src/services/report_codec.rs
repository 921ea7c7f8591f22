//! Report file format
//!
//! A report file is a single LZ4 frame (block and content checksums on)
//! wrapping a bincode-encoded `Vec<QueryRecord>`. The whole frame is
//! decompressed and verified before the payload is decoded, so a damaged file
//! is rejected as a unit instead of yielding a prefix of its records.
//!
//! The frame decoder accepts end of input as end of frame, so a file cut
//! right after a block would otherwise decode. Every frame we write ends with
//! the end mark and the content checksum, and `decode` requires both.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use bincode::Options;
use lz4_flex::frame::{FrameDecoder, FrameEncoder, FrameInfo};

use crate::models::{QueryRecord, Report};
use crate::utils::error::{CodecError, QrepError, QrepResult};

fn payload_options() -> impl Options {
    bincode::DefaultOptions::new().reject_trailing_bytes()
}

/// Zero-length block marker followed by the content checksum
const FRAME_END_MARK: [u8; 4] = [0; 4];
const FRAME_TRAILER_LEN: usize = 8;

fn frame_info() -> FrameInfo {
    FrameInfo::new().block_checksums(true).content_checksum(true)
}

/// Serialize and compress a record list
pub fn encode(records: &[QueryRecord]) -> Result<Vec<u8>, CodecError> {
    let payload = payload_options().serialize(records)?;

    let mut encoder = FrameEncoder::with_frame_info(frame_info(), Vec::with_capacity(payload.len()));
    encoder.write_all(&payload).map_err(|e| CodecError::Compression(e.to_string()))?;
    encoder.finish().map_err(|e| CodecError::Compression(e.to_string()))
}

/// Decompress and deserialize a record list produced by [`encode`]
pub fn decode(bytes: &[u8]) -> Result<Vec<QueryRecord>, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::Empty);
    }
    if !has_frame_trailer(bytes) {
        return Err(CodecError::Compression("missing frame end mark".to_string()));
    }

    let mut payload = Vec::with_capacity(bytes.len() * 4);
    FrameDecoder::new(bytes)
        .read_to_end(&mut payload)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    if payload.is_empty() {
        return Err(CodecError::Compression("no frame data".to_string()));
    }

    Ok(payload_options().deserialize(&payload)?)
}

fn has_frame_trailer(bytes: &[u8]) -> bool {
    bytes.len() >= FRAME_TRAILER_LEN
        && bytes[bytes.len() - FRAME_TRAILER_LEN..bytes.len() - 4] == FRAME_END_MARK
}

/// Write a report so that the destination either holds the complete new
/// report or is left untouched.
pub fn write_report(path: impl AsRef<Path>, report: &Report) -> QrepResult<()> {
    let path = path.as_ref();
    let bytes = encode(report.records()).map_err(|e| QrepError::codec(path, e))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".qrep-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| QrepError::io(path, e))?;
    tmp.write_all(&bytes).map_err(|e| QrepError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| QrepError::io(path, e))?;
    tmp.persist(path).map_err(|e| QrepError::io(path, e.error))?;

    tracing::debug!(
        path = %path.display(),
        records = report.len(),
        bytes = bytes.len(),
        "Report written"
    );
    Ok(())
}

/// Read and fully decode a report file
pub fn read_report(path: impl AsRef<Path>) -> QrepResult<Report> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| QrepError::io(path, e))?;
    let records = decode(&bytes).map_err(|e| QrepError::codec(path, e))?;

    tracing::debug!(path = %path.display(), records = records.len(), "Report read");
    Ok(Report::from_records(records))
}
