pub mod app;
pub mod args;
pub mod colors;
pub mod error;
pub mod file_node;
pub mod logging;
pub mod navigator;
pub mod progress;
pub mod scanner;
pub mod ui;
pub mod utils;

pub use app::{App, Page, ResultsPage};
pub use args::Args;
pub use error::{EntryError, NavigationMisuse, ScanErrorKind, is_scan_cancelled};
pub use file_node::{FileNode, FileTree};
pub use indextree::NodeId;
pub use navigator::{Navigator, Row, View};
pub use progress::{ProgressReporter, ProgressTick};
pub use scanner::{ScanControl, ScanHandle, ScanOptions, ScanReport, ScanStatus, Scanner, resolve_root};
