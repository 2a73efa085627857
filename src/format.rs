//! Bit-exact encoding/decoding of WAL entries.
//!
//! Every entry is framed uniformly as `tag: u8, payload_len: u32, payload,
//! crc: u32`, all integers big-endian, `crc` a CRC32C over `tag || len ||
//! payload`. The uniform frame means even an entry this reader doesn't
//! recognise can be located and reported as `Corrupt` rather than derailing
//! the rest of the scan.

use crate::error::{Result, ScanError};
use crate::io::Channel;
use crate::position::LogPosition;

pub const TAG_HEADER: u8 = 1;
pub const TAG_START: u8 = 2;
pub const TAG_COMMIT: u8 = 3;
pub const TAG_CHECKPOINT: u8 = 4;
pub const TAG_COMMAND: u8 = 5;
pub const TAG_ROLLBACK: u8 = 6;

const TAG_LEN: u64 = 1;
const LEN_LEN: u64 = 4;
const CRC_LEN: u64 = 4;
/// bytes of framing overhead around the payload: tag + len + crc.
pub const FRAME_OVERHEAD: u64 = TAG_LEN + LEN_LEN + CRC_LEN;

const HEADER_PAYLOAD_LEN: usize = 17;
const START_FIXED_LEN: usize = 20;
const COMMIT_PAYLOAD_LEN: usize = 20;
const CHECKPOINT_PAYLOAD_LEN: usize = 16;

/// One decoded WAL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Header {
        segment_version: u64,
        store_id: u64,
        format_version: u8,
    },
    Start {
        previous_checksum: u32,
        time_written: i64,
        last_committed_tx: i64,
        additional: Vec<u8>,
    },
    Commit {
        tx_id: i64,
        time_committed: i64,
        checksum: u32,
    },
    CheckPoint {
        target: LogPosition,
    },
    /// A recognised-but-opaque entry kind: command records, rollbacks.
    /// The scanner only needs to know one occupied this position; it never
    /// interprets `payload`.
    Other { tag: u8, payload: Vec<u8> },
}

impl LogEntry {
    pub fn is_start(&self) -> bool {
        matches!(self, LogEntry::Start { .. })
    }

    pub fn is_commit(&self) -> bool {
        matches!(self, LogEntry::Commit { .. })
    }

    pub fn as_checkpoint(&self) -> Option<LogPosition> {
        match self {
            LogEntry::CheckPoint { target } => Some(*target),
            _ => None,
        }
    }
}

/// Why a frame was judged unreadable: an unknown entry tag, a checksum
/// mismatch, a truncated payload, or EOF mid-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptReason {
    UnknownTag(u8),
    ChecksumMismatch,
    Truncated,
    PayloadTooLarge { declared: u32, max: u32 },
}

impl std::fmt::Display for CorruptReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorruptReason::UnknownTag(tag) => write!(f, "unknown entry tag {tag}"),
            CorruptReason::ChecksumMismatch => write!(f, "checksum mismatch"),
            CorruptReason::Truncated => write!(f, "frame truncated"),
            CorruptReason::PayloadTooLarge { declared, max } => {
                write!(f, "declared payload length {declared} exceeds cap {max}")
            }
        }
    }
}

/// Result of decoding one entry.
#[derive(Debug)]
pub enum DecodeOutcome {
    Entry { entry: LogEntry, bytes_consumed: u64 },
    /// EOF observed exactly at an entry boundary.
    CleanEnd,
    Corrupt(CorruptReason),
}

fn is_eof(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::UnexpectedEof
}

/// Decode one entry from `channel` at `offset`.
///
/// `max_payload` bounds `payload_len` so a corrupt length can never drive an
/// unbounded allocation. `max_format_version` is the currently-known format
/// version: a `Header` declaring a higher version is the one condition this
/// function treats as fatal (`UnsupportedFormat`) rather than `Corrupt`.
pub fn decode_entry(
    channel: &dyn Channel,
    offset: u64,
    max_payload: u32,
    max_format_version: u8,
) -> Result<DecodeOutcome> {
    let mut tag_buf = [0u8; 1];
    match channel.read_at(&mut tag_buf, offset) {
        Ok(0) => return Ok(DecodeOutcome::CleanEnd),
        Ok(_) => {}
        Err(e) => return Err(e.into()),
    }
    let tag = tag_buf[0];

    if !matches!(
        tag,
        TAG_HEADER | TAG_START | TAG_COMMIT | TAG_CHECKPOINT | TAG_COMMAND | TAG_ROLLBACK
    ) {
        return Ok(DecodeOutcome::Corrupt(CorruptReason::UnknownTag(tag)));
    }

    let mut len_buf = [0u8; 4];
    if let Err(e) = channel.read_exact_at(&mut len_buf, offset + TAG_LEN) {
        return if is_eof(&e) {
            Ok(DecodeOutcome::Corrupt(CorruptReason::Truncated))
        } else {
            Err(e.into())
        };
    }
    let payload_len = u32::from_be_bytes(len_buf);
    if payload_len > max_payload {
        return Ok(DecodeOutcome::Corrupt(CorruptReason::PayloadTooLarge {
            declared: payload_len,
            max: max_payload,
        }));
    }

    let mut payload = vec![0u8; payload_len as usize];
    if let Err(e) = channel.read_exact_at(&mut payload, offset + TAG_LEN + LEN_LEN) {
        return if is_eof(&e) {
            Ok(DecodeOutcome::Corrupt(CorruptReason::Truncated))
        } else {
            Err(e.into())
        };
    }

    let mut crc_buf = [0u8; 4];
    let crc_offset = offset + TAG_LEN + LEN_LEN + payload_len as u64;
    if let Err(e) = channel.read_exact_at(&mut crc_buf, crc_offset) {
        return if is_eof(&e) {
            Ok(DecodeOutcome::Corrupt(CorruptReason::Truncated))
        } else {
            Err(e.into())
        };
    }
    let declared_crc = u32::from_be_bytes(crc_buf);

    let mut computed = crc32c::crc32c(&tag_buf);
    computed = crc32c::crc32c_append(computed, &len_buf);
    computed = crc32c::crc32c_append(computed, &payload);
    if computed != declared_crc {
        return Ok(DecodeOutcome::Corrupt(CorruptReason::ChecksumMismatch));
    }

    let entry = match tag {
        TAG_HEADER => {
            if payload.len() != HEADER_PAYLOAD_LEN {
                return Ok(DecodeOutcome::Corrupt(CorruptReason::Truncated));
            }
            let segment_version = u64::from_be_bytes(payload[0..8].try_into().unwrap());
            let store_id = u64::from_be_bytes(payload[8..16].try_into().unwrap());
            let format_version = payload[16];
            if format_version > max_format_version {
                return Err(ScanError::UnsupportedFormat {
                    segment_version,
                    format_version,
                });
            }
            LogEntry::Header {
                segment_version,
                store_id,
                format_version,
            }
        }
        TAG_START => {
            if payload.len() < START_FIXED_LEN {
                return Ok(DecodeOutcome::Corrupt(CorruptReason::Truncated));
            }
            let previous_checksum = u32::from_be_bytes(payload[0..4].try_into().unwrap());
            let time_written = i64::from_be_bytes(payload[4..12].try_into().unwrap());
            let last_committed_tx = i64::from_be_bytes(payload[12..20].try_into().unwrap());
            LogEntry::Start {
                previous_checksum,
                time_written,
                last_committed_tx,
                additional: payload[START_FIXED_LEN..].to_vec(),
            }
        }
        TAG_COMMIT => {
            if payload.len() != COMMIT_PAYLOAD_LEN {
                return Ok(DecodeOutcome::Corrupt(CorruptReason::Truncated));
            }
            let tx_id = i64::from_be_bytes(payload[0..8].try_into().unwrap());
            let time_committed = i64::from_be_bytes(payload[8..16].try_into().unwrap());
            let checksum = u32::from_be_bytes(payload[16..20].try_into().unwrap());
            LogEntry::Commit {
                tx_id,
                time_committed,
                checksum,
            }
        }
        TAG_CHECKPOINT => {
            if payload.len() != CHECKPOINT_PAYLOAD_LEN {
                return Ok(DecodeOutcome::Corrupt(CorruptReason::Truncated));
            }
            let target_segment_version = u64::from_be_bytes(payload[0..8].try_into().unwrap());
            let target_byte_offset = u64::from_be_bytes(payload[8..16].try_into().unwrap());
            LogEntry::CheckPoint {
                target: LogPosition::new(target_segment_version, target_byte_offset),
            }
        }
        TAG_COMMAND | TAG_ROLLBACK => LogEntry::Other { tag, payload },
        _ => unreachable!("unrecognised tags are rejected above"),
    };

    let bytes_consumed = FRAME_OVERHEAD + payload_len as u64;
    Ok(DecodeOutcome::Entry {
        entry,
        bytes_consumed,
    })
}

/// Encode `entry` to its wire form. Used by the test suite to build fixtures
/// and by any future writer; the scanner itself never calls this, since
/// writing log entries is outside its job.
pub fn encode_entry(entry: &LogEntry) -> Vec<u8> {
    let (tag, payload) = match entry {
        LogEntry::Header {
            segment_version,
            store_id,
            format_version,
        } => {
            let mut payload = Vec::with_capacity(HEADER_PAYLOAD_LEN);
            payload.extend_from_slice(&segment_version.to_be_bytes());
            payload.extend_from_slice(&store_id.to_be_bytes());
            payload.push(*format_version);
            (TAG_HEADER, payload)
        }
        LogEntry::Start {
            previous_checksum,
            time_written,
            last_committed_tx,
            additional,
        } => {
            let mut payload = Vec::with_capacity(START_FIXED_LEN + additional.len());
            payload.extend_from_slice(&previous_checksum.to_be_bytes());
            payload.extend_from_slice(&time_written.to_be_bytes());
            payload.extend_from_slice(&last_committed_tx.to_be_bytes());
            payload.extend_from_slice(additional);
            (TAG_START, payload)
        }
        LogEntry::Commit {
            tx_id,
            time_committed,
            checksum,
        } => {
            let mut payload = Vec::with_capacity(COMMIT_PAYLOAD_LEN);
            payload.extend_from_slice(&tx_id.to_be_bytes());
            payload.extend_from_slice(&time_committed.to_be_bytes());
            payload.extend_from_slice(&checksum.to_be_bytes());
            (TAG_COMMIT, payload)
        }
        LogEntry::CheckPoint { target } => {
            let mut payload = Vec::with_capacity(CHECKPOINT_PAYLOAD_LEN);
            payload.extend_from_slice(&target.segment_version.to_be_bytes());
            payload.extend_from_slice(&target.byte_offset.to_be_bytes());
            (TAG_CHECKPOINT, payload)
        }
        LogEntry::Other { tag, payload } => (*tag, payload.clone()),
    };

    let len = payload.len() as u32;
    let mut frame = Vec::with_capacity(FRAME_OVERHEAD as usize + payload.len());
    frame.push(tag);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&payload);

    let mut crc = crc32c::crc32c(&frame[0..1]);
    crc = crc32c::crc32c_append(crc, &frame[1..5]);
    crc = crc32c::crc32c_append(crc, &payload);
    frame.extend_from_slice(&crc.to_be_bytes());

    frame
}
