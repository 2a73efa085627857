//! A thin positioned iterator over [`crate::format`].

use crate::error::Result;
use crate::format::{decode_entry, CorruptReason, DecodeOutcome, LogEntry};
use crate::io::Channel;
use crate::position::LogPosition;

/// Outcome of reading the next entry from a segment.
#[derive(Debug)]
pub enum ReadOutcome {
    Entry { position: LogPosition, entry: LogEntry },
    CleanEnd,
    Corrupt { position: LogPosition, reason: CorruptReason },
}

/// Produces a lazy, finite, non-restartable sequence of `(LogPosition,
/// LogEntry)` pairs for one segment. Cheap to construct; does not buffer
/// across segment boundaries — it only ever knows about the single channel
/// it was built with.
pub struct EntryReader<'a> {
    channel: &'a dyn Channel,
    segment_version: u64,
    offset: u64,
    max_payload: u32,
    max_format_version: u8,
    finished: Option<ReadOutcomeKind>,
}

#[derive(Debug, Clone, Copy)]
enum ReadOutcomeKind {
    CleanEnd,
    Corrupt(CorruptReason),
}

impl<'a> EntryReader<'a> {
    pub fn new(
        channel: &'a dyn Channel,
        segment_version: u64,
        max_payload: u32,
        max_format_version: u8,
    ) -> Self {
        Self {
            channel,
            segment_version,
            offset: 0,
            max_payload,
            max_format_version,
            finished: None,
        }
    }

    /// Position the next call to [`Self::next_entry`] will read from.
    pub fn position(&self) -> LogPosition {
        LogPosition::new(self.segment_version, self.offset)
    }

    pub fn next_entry(&mut self) -> Result<ReadOutcome> {
        let position = self.position();

        if let Some(kind) = self.finished {
            return Ok(match kind {
                ReadOutcomeKind::CleanEnd => ReadOutcome::CleanEnd,
                ReadOutcomeKind::Corrupt(reason) => ReadOutcome::Corrupt { position, reason },
            });
        }

        match decode_entry(self.channel, self.offset, self.max_payload, self.max_format_version)? {
            DecodeOutcome::Entry {
                entry,
                bytes_consumed,
            } => {
                self.offset += bytes_consumed;
                Ok(ReadOutcome::Entry { position, entry })
            }
            DecodeOutcome::CleanEnd => {
                self.finished = Some(ReadOutcomeKind::CleanEnd);
                Ok(ReadOutcome::CleanEnd)
            }
            DecodeOutcome::Corrupt(reason) => {
                self.finished = Some(ReadOutcomeKind::Corrupt(reason));
                Ok(ReadOutcome::Corrupt { position, reason })
            }
        }
    }
}
