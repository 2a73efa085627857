//! The reverse multi-segment scan and its decision procedure.

use crate::config::ScannerConfig;
use crate::entry_reader::{EntryReader, ReadOutcome};
use crate::error::Result;
use crate::file_set::LogFileSet;
use crate::format::{CorruptReason, LogEntry};
use crate::io::Channel;
use crate::monitor::{notify_corrupted, notify_scan_complete, notify_segment_opened, NoopMonitor, ScanMonitor};
use crate::position::LogPosition;

/// Reserved sentinel for "no transaction id applies". Any value outside the
/// valid txId domain works, provided it is stable; this crate fixes it at
/// `-1`.
pub const NO_TRANSACTION_ID: i64 = -1;

/// Identifies which logical store a WAL belongs to; carried in every
/// segment's `Header` entry.
pub type StoreId = u64;

/// A durability marker: the position of the `CheckPoint` entry itself, and
/// the position it claims durability up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckPoint {
    pub position: LogPosition,
    pub target: LogPosition,
}

/// The verdict a scan produces. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailInformation {
    pub last_check_point: Option<CheckPoint>,
    pub commits_after_last_check_point: bool,
    pub first_tx_id_after_last_check_point: i64,
    pub oldest_segment_version_found: i64,
    pub latest_segment_version: i64,
    pub logs_missing: bool,
    pub latest_entry_format_version: u8,
    pub store_id: StoreId,
    pub is_recovery_required: bool,
}

/// Orchestrates the reverse scan over a [`LogFileSet`] and produces a
/// [`TailInformation`].
pub struct TailScanner {
    file_set: LogFileSet,
    config: ScannerConfig,
    monitor: Box<dyn ScanMonitor>,
}

impl TailScanner {
    pub fn new(file_set: LogFileSet, config: ScannerConfig) -> Self {
        Self::with_monitor(file_set, config, Box::new(NoopMonitor))
    }

    pub fn with_monitor(file_set: LogFileSet, config: ScannerConfig, monitor: Box<dyn ScanMonitor>) -> Self {
        Self {
            file_set,
            config,
            monitor,
        }
    }

    pub fn scan_tail(&self) -> Result<TailInformation> {
        if !self.file_set.any_files()? {
            let info = TailInformation {
                last_check_point: None,
                commits_after_last_check_point: false,
                first_tx_id_after_last_check_point: NO_TRANSACTION_ID,
                oldest_segment_version_found: -1,
                latest_segment_version: -1,
                logs_missing: true,
                latest_entry_format_version: 0,
                store_id: 0,
                is_recovery_required: true,
            };
            notify_scan_complete(self.monitor.as_ref(), &info);
            return Ok(info);
        }

        let versions = self.file_set.versions_descending()?;
        let latest_segment_version = versions[0];

        let mut segments: Vec<(u64, Vec<(LogPosition, LogEntry)>)> = Vec::new();
        let mut header_info: Option<(StoreId, u8)> = None;
        let mut corrupt_tail_seen = false;
        let mut oldest_segment_version_found = latest_segment_version;
        // (segment the checkpoint was found in, the checkpoint itself)
        let mut found_checkpoint: Option<(u64, CheckPoint)> = None;

        let mut idx = 0;
        while idx < versions.len() {
            let version = versions[idx];
            let entries = self.scan_one_segment(version, &mut header_info, &mut corrupt_tail_seen)?;
            oldest_segment_version_found = version;

            // The highest-versioned segment that contains any checkpoint
            // necessarily contains the globally-latest one: every segment
            // above it was already scanned and held none.
            let local_checkpoint = entries.iter().rev().find_map(|(position, entry)| {
                entry.as_checkpoint().map(|target| CheckPoint {
                    position: *position,
                    target,
                })
            });

            segments.push((version, entries));
            idx += 1;

            if let Some(checkpoint) = local_checkpoint {
                found_checkpoint = Some((version, checkpoint));
                break;
            }
        }

        if let Some((found_version, checkpoint)) = found_checkpoint {
            let target_version = checkpoint.target.segment_version;
            // The checkpoint's target may live in an older segment; keep
            // descending until that segment has been read, inclusive.
            if target_version < found_version {
                while idx < versions.len() {
                    let version = versions[idx];
                    if version < target_version {
                        break;
                    }
                    let entries = self.scan_one_segment(version, &mut header_info, &mut corrupt_tail_seen)?;
                    oldest_segment_version_found = version;
                    segments.push((version, entries));
                    idx += 1;

                    if version == target_version {
                        break;
                    }
                }
            }
            found_checkpoint = Some((found_version, checkpoint));
        }

        let last_check_point = found_checkpoint.map(|(_, checkpoint)| checkpoint);
        let threshold = last_check_point
            .map(|checkpoint| checkpoint.target)
            .unwrap_or(LogPosition::new(0, 0));

        let mut commits_after_last_check_point = false;
        let mut first_tx_id_after_last_check_point = NO_TRANSACTION_ID;
        let mut pending_start: Option<LogPosition> = None;

        // `segments` was accumulated highest-version-first; reverse it so
        // entries are visited in true chronological order.
        for (_, entries) in segments.iter().rev() {
            for (position, entry) in entries {
                match entry {
                    LogEntry::Start { .. } => {
                        if *position >= threshold {
                            commits_after_last_check_point = true;
                            pending_start = Some(*position);
                        } else {
                            pending_start = None;
                        }
                    }
                    LogEntry::Commit { tx_id, .. } => {
                        if *position > threshold {
                            commits_after_last_check_point = true;
                        }
                        if first_tx_id_after_last_check_point == NO_TRANSACTION_ID {
                            if pending_start.is_some() {
                                first_tx_id_after_last_check_point = *tx_id;
                            }
                        }
                        pending_start = None;
                    }
                    _ => {}
                }
            }
        }

        let (store_id, latest_entry_format_version) = header_info.unwrap_or((0, 0));
        let is_recovery_required =
            commits_after_last_check_point || corrupt_tail_seen || last_check_point.is_none();

        let info = TailInformation {
            last_check_point,
            commits_after_last_check_point,
            first_tx_id_after_last_check_point,
            oldest_segment_version_found: oldest_segment_version_found as i64,
            latest_segment_version: latest_segment_version as i64,
            logs_missing: false,
            latest_entry_format_version,
            store_id,
            is_recovery_required,
        };
        notify_scan_complete(self.monitor.as_ref(), &info);
        Ok(info)
    }

    fn scan_one_segment(
        &self,
        version: u64,
        header_info: &mut Option<(StoreId, u8)>,
        corrupt_tail_seen: &mut bool,
    ) -> Result<Vec<(LogPosition, LogEntry)>> {
        notify_segment_opened(self.monitor.as_ref(), version);
        let (entries, corrupt) = self.read_segment(version)?;

        if header_info.is_none() {
            if let Some((_, LogEntry::Header { store_id, format_version, .. })) = entries.first() {
                *header_info = Some((*store_id, *format_version));
            }
        }

        if let Some((position, reason)) = corrupt {
            *corrupt_tail_seen = true;
            notify_corrupted(self.monitor.as_ref(), version, position.byte_offset, reason);
        }

        Ok(entries)
    }

    fn read_segment(
        &self,
        version: u64,
    ) -> Result<(Vec<(LogPosition, LogEntry)>, Option<(LogPosition, CorruptReason)>)> {
        let channel = self.file_set.open(version)?;
        let channel: &dyn Channel = &channel;
        let mut reader = EntryReader::new(
            channel,
            version,
            self.config.max_entry_payload_bytes,
            self.config.max_supported_format_version,
        );
        let mut entries = Vec::new();
        loop {
            match reader.next_entry()? {
                ReadOutcome::Entry { position, entry } => entries.push((position, entry)),
                ReadOutcome::CleanEnd => return Ok((entries, None)),
                ReadOutcome::Corrupt { position, reason } => return Ok((entries, Some((position, reason)))),
            }
        }
    }
}
