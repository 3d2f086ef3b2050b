use crate::{
    args::Args,
    error::{EntryError, ScanCancelled, ScanErrorKind},
    file_node::{FileNode, FileTree},
    utils::num_cpus,
};
use anyhow::{Context, Result, anyhow, bail};
use crossbeam_channel::{Receiver, TryRecvError};
use indextree::NodeId;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

#[cfg(windows)]
use crate::utils::get_drive_letter;

#[cfg(not(windows))]
use crate::utils::get_volume_id;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub one_file_system: bool,
}

impl From<&Args> for ScanOptions {
    fn from(args: &Args) -> Self {
        Self {
            one_file_system: args.one_file_system,
        }
    }
}

#[derive(Clone, Default, Debug)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}

/// Shared between a running walk and whoever is watching it
#[derive(Clone, Default, Debug)]
pub struct ScanControl {
    cancel: CancelFlag,
    entries_seen: Arc<AtomicU64>,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn entries_seen(&self) -> u64 {
        self.entries_seen.load(Ordering::Relaxed)
    }

    /// Counter handle for the progress reporter
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.entries_seen)
    }
}

/// Everything a finished walk hands over to the UI thread
#[derive(Debug)]
pub struct ScanReport {
    pub tree: FileTree,
    pub errors: Vec<EntryError>,
    pub entries_seen: u64,
    pub elapsed: Duration,
}

/// Checks that `path` can be scanned at all. Failing here is fatal.
pub fn resolve_root(path: &Path) -> Result<PathBuf> {
    let root = fs::canonicalize(path)
        .with_context(|| format!("cannot access {}", path.display()))?;
    let meta = fs::metadata(&root)
        .with_context(|| format!("metadata access failed for {}", root.display()))?;
    if !meta.is_dir() {
        bail!("{} is not a directory", root.display());
    }
    fs::read_dir(&root)
        .with_context(|| format!("failed to read directory {}", root.display()))?;
    Ok(root)
}

/// Single-pass directory scanner using jwalk. Symbolic links are never
/// followed; they are kept as zero-size leaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scanner {
    options: ScanOptions,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Walks `path` on the calling thread
    pub fn scan(&self, path: &Path, control: &ScanControl) -> Result<ScanReport> {
        use jwalk::WalkDir;

        let started = Instant::now();
        let root_path = resolve_root(path)?;
        let mtime = fs::metadata(&root_path).ok().and_then(|m| m.modified().ok());

        let mut tree = FileTree::new(&root_path, mtime);
        let mut dirs: HashMap<PathBuf, NodeId> = HashMap::new();
        dirs.insert(root_path.clone(), tree.root());
        let mut errors: Vec<EntryError> = Vec::new();

        #[cfg(not(windows))]
        let root_volume = get_volume_id(&root_path);

        let walker = WalkDir::new(&root_path)
            .follow_links(false)
            .skip_hidden(false)
            .sort(true)
            .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus()));

        // Entries on another device are dropped before jwalk can descend
        #[cfg(not(windows))]
        let walker = match root_volume.filter(|_| self.options.one_file_system) {
            Some(root_dev) => walker.process_read_dir(move |_, _, _, children| {
                use std::os::unix::fs::MetadataExt;
                children.retain(|child| match child {
                    Ok(entry) => !entry.metadata().is_ok_and(|m| m.dev() != root_dev),
                    Err(_) => true,
                });
            }),
            None => walker,
        };

        info!(root = %root_path.display(), "scan started");

        for entry_result in walker {
            if control.is_cancelled() {
                info!(root = %root_path.display(), seen = control.entries_seen(), "scan cancelled");
                return Err(anyhow::Error::new(ScanCancelled))
                    .with_context(|| format!("scanning {}", root_path.display()));
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let kind = e.io_error().map(ScanErrorKind::from_io).unwrap_or(ScanErrorKind::Other);
                    let path = e.path().map(Path::to_path_buf);
                    let id = path.as_ref().and_then(|p| dirs.get(p)).copied();
                    record_error(&mut tree, &mut errors, id, path, kind, e.to_string());
                    continue;
                }
            };

            let entry_path = entry.path();

            if entry.depth == 0 {
                if let Some(e) = &entry.read_children_error {
                    let kind = e.io_error().map(ScanErrorKind::from_io).unwrap_or(ScanErrorKind::Other);
                    let root_id = tree.root();
                    record_error(&mut tree, &mut errors, Some(root_id), Some(entry_path), kind, e.to_string());
                }
                continue;
            }

            control.entries_seen.fetch_add(1, Ordering::Relaxed);

            // Parent was skipped, so is its subtree
            let Some(parent_id) = entry_path.parent().and_then(|p| dirs.get(p)).copied() else {
                debug!(path = %entry_path.display(), "dropping entry without a scanned parent");
                continue;
            };

            let name = entry.file_name.to_string_lossy().to_string();

            let node = match entry.metadata() {
                Ok(m) => {
                    #[cfg(windows)]
                    if self.options.one_file_system
                        && let (Some(root_drive), Some(entry_drive)) = (
                            get_drive_letter(&root_path),
                            get_drive_letter(&entry_path)
                        )
                            && root_drive != entry_drive {
                                continue;
                            }

                    let size = if m.is_file() { m.len() } else { 0 };
                    FileNode::new(entry_path.clone(), name, size, m.is_dir(), m.modified().ok())
                }
                Err(e) => {
                    let kind = e.io_error().map(ScanErrorKind::from_io).unwrap_or(ScanErrorKind::Other);
                    warn!(path = %entry_path.display(), error = %e, "could not read metadata");
                    errors.push(EntryError {
                        path: Some(entry_path.clone()),
                        kind,
                        message: e.to_string(),
                    });
                    FileNode::unreadable(entry_path.clone(), name, kind)
                }
            };

            let is_dir = node.is_dir;
            let Some(id) = tree.insert(parent_id, node) else {
                continue;
            };
            if is_dir {
                dirs.insert(entry_path.clone(), id);
            }

            if let Some(e) = &entry.read_children_error {
                let kind = e.io_error().map(ScanErrorKind::from_io).unwrap_or(ScanErrorKind::Other);
                record_error(&mut tree, &mut errors, Some(id), Some(entry_path), kind, e.to_string());
            }
        }

        let report = ScanReport {
            entries_seen: control.entries_seen(),
            errors,
            elapsed: started.elapsed(),
            tree,
        };
        info!(
            root = %root_path.display(),
            nodes = report.tree.len(),
            errors = report.errors.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "scan finished"
        );
        Ok(report)
    }

    /// Runs [`Scanner::scan`] on a background thread
    pub fn spawn(&self, path: PathBuf) -> Result<ScanHandle> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let control = ScanControl::new();
        let scanner = *self;
        let thread_control = control.clone();

        thread::Builder::new()
            .name("dudrill-scan".to_string())
            .spawn(move || {
                let result = scanner.scan(&path, &thread_control);
                if let Err(e) = &result
                    && !crate::error::is_scan_cancelled(e) {
                        warn!(error = %format!("{e:#}"), "scan failed");
                    }
                // The receiver is gone once the scanning page is disposed
                let _ = tx.send(result);
            })
            .context("failed to start scanner thread")?;

        Ok(ScanHandle { control, done: rx })
    }
}

fn record_error(
    tree: &mut FileTree,
    errors: &mut Vec<EntryError>,
    id: Option<NodeId>,
    path: Option<PathBuf>,
    kind: ScanErrorKind,
    message: String,
) {
    if let Some(id) = id {
        if tree.node(id).is_some_and(|n| n.error.is_some()) {
            return;
        }
        tree.mark_error(id, kind);
    }
    match &path {
        Some(p) => warn!(path = %p.display(), error = %message, "skipping unreadable entry"),
        None => warn!(error = %message, "walk error"),
    }
    errors.push(EntryError { path, kind, message });
}

pub enum ScanStatus {
    Pending,
    Finished(Result<ScanReport>),
}

/// Handle to a walk running on its own thread. Dropping it cancels the walk.
pub struct ScanHandle {
    control: ScanControl,
    done: Receiver<Result<ScanReport>>,
}

impl ScanHandle {
    pub fn control(&self) -> &ScanControl {
        &self.control
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn try_finish(&self) -> ScanStatus {
        match self.done.try_recv() {
            Ok(result) => ScanStatus::Finished(result),
            Err(TryRecvError::Empty) => ScanStatus::Pending,
            Err(TryRecvError::Disconnected) => {
                ScanStatus::Finished(Err(anyhow!("scanner thread exited without a result")))
            }
        }
    }

    /// Blocks until the walk finishes
    pub fn wait(&self) -> Result<ScanReport> {
        self.done
            .recv()
            .map_err(|_| anyhow!("scanner thread exited without a result"))?
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.control.cancel();
    }
}
