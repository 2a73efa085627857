//! Observability hooks for a scan.

use crate::format::CorruptReason;
use crate::scanner::TailInformation;

/// A push-only observer of scan progress. All three hooks are best-effort:
/// a panicking implementation must never change the verdict, so every call
/// site isolates the hook with `catch_unwind` (see the `notify_*` helpers
/// below) rather than trusting implementors to be panic-free.
pub trait ScanMonitor {
    fn on_corrupted_log_file(&self, _segment_version: u64, _byte_position: u64, _reason: CorruptReason) {}
    fn on_segment_opened(&self, _segment_version: u64) {}
    fn on_scan_complete(&self, _info: &TailInformation) {}
}

/// The default monitor: observes nothing. Injected at construction so call
/// sites never need to null-check for "no monitor configured".
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMonitor;

impl ScanMonitor for NoopMonitor {}

/// A monitor that reports through `tracing`, so a deployment that never
/// wires a custom `ScanMonitor` still gets visibility via its subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMonitor;

impl ScanMonitor for TracingMonitor {
    fn on_corrupted_log_file(&self, segment_version: u64, byte_position: u64, reason: CorruptReason) {
        tracing::warn!(segment_version, byte_position, %reason, "corrupt tail encountered");
    }

    fn on_segment_opened(&self, segment_version: u64) {
        tracing::debug!(segment_version, "segment opened");
    }

    fn on_scan_complete(&self, info: &TailInformation) {
        tracing::info!(
            is_recovery_required = info.is_recovery_required,
            logs_missing = info.logs_missing,
            commits_after_last_check_point = info.commits_after_last_check_point,
            oldest_segment_version_found = info.oldest_segment_version_found,
            latest_segment_version = info.latest_segment_version,
            "scan complete"
        );
    }
}

pub(crate) fn notify_corrupted(
    monitor: &dyn ScanMonitor,
    segment_version: u64,
    byte_position: u64,
    reason: CorruptReason,
) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        monitor.on_corrupted_log_file(segment_version, byte_position, reason);
    }));
    if outcome.is_err() {
        tracing::error!(segment_version, byte_position, "monitor panicked in on_corrupted_log_file");
    }
}

pub(crate) fn notify_segment_opened(monitor: &dyn ScanMonitor, segment_version: u64) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        monitor.on_segment_opened(segment_version);
    }));
    if outcome.is_err() {
        tracing::error!(segment_version, "monitor panicked in on_segment_opened");
    }
}

pub(crate) fn notify_scan_complete(monitor: &dyn ScanMonitor, info: &TailInformation) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        monitor.on_scan_complete(info);
    }));
    if outcome.is_err() {
        tracing::error!("monitor panicked in on_scan_complete");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct PanickingMonitor;
    impl ScanMonitor for PanickingMonitor {
        fn on_segment_opened(&self, _segment_version: u64) {
            panic!("boom");
        }
    }

    #[test]
    fn panicking_monitor_is_isolated() {
        notify_segment_opened(&PanickingMonitor, 1);
    }

    #[test]
    fn noop_monitor_does_nothing_observable() {
        notify_segment_opened(&NoopMonitor, 1);
        notify_corrupted(&NoopMonitor, 1, 0, CorruptReason::Truncated);
    }
}
