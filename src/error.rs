use std::{io, path::PathBuf};

/// Classification for entries the scanner had to skip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanErrorKind {
    AccessDenied,
    NotFound,
    Other,
}

impl ScanErrorKind {
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::AccessDenied,
            io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AccessDenied => "access denied",
            Self::NotFound => "not found",
            Self::Other => "error",
        }
    }
}

/// A single entry that could not be read during the walk
#[derive(Debug, Clone)]
pub struct EntryError {
    pub path: Option<PathBuf>,
    pub kind: ScanErrorKind,
    pub message: String,
}

/// Marker error returned by a walk that was cancelled before completion
#[derive(Debug)]
pub struct ScanCancelled;

impl std::error::Error for ScanCancelled {}

impl std::fmt::Display for ScanCancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scan cancelled")
    }
}

pub fn is_scan_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ScanCancelled>().is_some()
}

/// Rejected navigator operations. These are caller mistakes, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMisuse {
    NotADirectory,
    UnknownNode,
    AtRoot,
    NoParent,
    NoSuchRow(usize),
}

impl std::error::Error for NavigationMisuse {}

impl std::fmt::Display for NavigationMisuse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotADirectory => write!(f, "Not a directory"),
            Self::UnknownNode => write!(f, "Entry is not part of the scanned tree"),
            Self::AtRoot => write!(f, "Already at the top view"),
            Self::NoParent => write!(f, "Scan root has no parent"),
            Self::NoSuchRow(row) => write!(f, "No row {} in the current view", row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_classified_by_kind() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let missing = io::Error::from(io::ErrorKind::NotFound);
        let other = io::Error::other("boom");

        assert_eq!(ScanErrorKind::from_io(&denied), ScanErrorKind::AccessDenied);
        assert_eq!(ScanErrorKind::from_io(&missing), ScanErrorKind::NotFound);
        assert_eq!(ScanErrorKind::from_io(&other), ScanErrorKind::Other);
    }

    #[test]
    fn cancelled_marker_survives_context() {
        let err = anyhow::Error::new(ScanCancelled).context("while scanning /tmp");
        assert!(is_scan_cancelled(&err));
        assert!(!is_scan_cancelled(&anyhow::anyhow!("unrelated")));
    }
}
