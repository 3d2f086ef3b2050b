use clap::Parser;
use std::{path::PathBuf, time::Duration};

/// dudrill: drill down into the disk usage of a directory tree
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory to scan (default: current)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Do not cross filesystem boundaries (drives on Windows)
    #[arg(short = 'x', long)]
    pub one_file_system: bool,

    /// Interval between progress updates while scanning, in milliseconds
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(10..))]
    pub tick_ms: u64,

    /// Write diagnostics to this file (filter with DUDRILL_LOG, default "info")
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_current_directory() -> Result<(), clap::Error> {
        let args = Args::try_parse_from(["dudrill"])?;
        assert_eq!(args.path, PathBuf::from("."));
        assert!(!args.one_file_system);
        assert_eq!(args.tick_interval(), Duration::from_millis(500));
        assert!(args.log_file.is_none());
        Ok(())
    }

    #[test]
    fn accepts_path_and_flags() -> Result<(), clap::Error> {
        let args = Args::try_parse_from(["dudrill", "-x", "--tick-ms", "100", "/var"])?;
        assert_eq!(args.path, PathBuf::from("/var"));
        assert!(args.one_file_system);
        assert_eq!(args.tick_ms, 100);
        Ok(())
    }

    #[test]
    fn rejects_tiny_tick_interval() {
        assert!(Args::try_parse_from(["dudrill", "--tick-ms", "1"]).is_err());
    }
}
