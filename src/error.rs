/// Fatal error classes a scan can abort with.
///
/// Every other condition the scanner can observe — missing logs, a corrupt
/// tail — is not an error: it is reported as a field on [`crate::TailInformation`].
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("segment {segment_version} declares unsupported format version {format_version}")]
    UnsupportedFormat {
        segment_version: u64,
        format_version: u8,
    },
}

pub type Result<T> = std::result::Result<T, ScanError>;
