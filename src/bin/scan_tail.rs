use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use wal_tail_scanner::{LogFileSet, ScannerConfig, TailScanner, TracingMonitor};

#[derive(Debug, clap::Parser)]
struct Cli {
    #[arg(long, short = 'd')]
    dir: PathBuf,
    #[arg(long, short = 'p')]
    prefix: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = ScannerConfig::default();
    if let Some(prefix) = cli.prefix {
        config.segment_prefix = prefix;
    }

    let file_set = LogFileSet::new(cli.dir.clone(), config.segment_prefix.clone());
    let scanner = TailScanner::with_monitor(file_set, config, Box::new(TracingMonitor));

    match scanner.scan_tail() {
        Ok(info) => {
            println!("{info:#?}");
            if info.is_recovery_required {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("scan failed: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_dir_and_optional_prefix() {
        let cli = Cli::try_parse_from(["scan-tail", "--dir", "/tmp/wal", "--prefix", "seg"]).unwrap();
        assert_eq!(cli.dir, PathBuf::from("/tmp/wal"));
        assert_eq!(cli.prefix.as_deref(), Some("seg"));
    }

    #[test]
    fn prefix_is_optional() {
        let cli = Cli::try_parse_from(["scan-tail", "--dir", "/tmp/wal"]).unwrap();
        assert_eq!(cli.prefix, None);
    }

    #[test]
    fn missing_dir_is_rejected() {
        assert!(Cli::try_parse_from(["scan-tail"]).is_err());
    }
}
