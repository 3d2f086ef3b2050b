use crate::error::ScanErrorKind;
use indextree::{Arena, NodeId};
use std::{
    cell::OnceCell,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Represents a file or directory
#[derive(Debug, Clone)]
pub struct FileNode {
    pub name: String,
    pub path: PathBuf,
    pub own_size: u64,
    pub is_dir: bool,
    pub modified_time: Option<SystemTime>,
    pub error: Option<ScanErrorKind>,
    size: OnceCell<u64>,
    count: OnceCell<u64>,
}

impl FileNode {
    pub fn new(path: PathBuf, name: String, own_size: u64, is_dir: bool, mtime: Option<SystemTime>) -> Self {
        Self {
            name,
            path,
            // Directories never carry bytes of their own
            own_size: if is_dir { 0 } else { own_size },
            is_dir,
            modified_time: mtime,
            error: None,
            size: OnceCell::new(),
            count: OnceCell::new(),
        }
    }

    /// A zero-size leaf for an entry whose metadata could not be read
    pub fn unreadable(path: PathBuf, name: String, kind: ScanErrorKind) -> Self {
        let mut node = Self::new(path, name, 0, false, None);
        node.error = Some(kind);
        node
    }

    /// Clears the memoized aggregates. Returns `false` if both were already
    /// empty.
    fn invalidate(&mut self) -> bool {
        self.size.take().is_some() | self.count.take().is_some()
    }
}

/// Scanned tree. The arena owns every node, children are kept in discovery
/// order and each node links back to its parent by id.
#[derive(Debug)]
pub struct FileTree {
    arena: Arena<FileNode>,
    root: NodeId,
}

impl FileTree {
    pub fn new(root_path: &Path, mtime: Option<SystemTime>) -> Self {
        let name = root_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root_path.display().to_string());
        let mut arena = Arena::new();
        let root = arena.new_node(FileNode::new(root_path.to_path_buf(), name, 0, true, mtime));
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total number of nodes, root included
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children(&self.arena).next().is_none()
    }

    pub fn node(&self, id: NodeId) -> Option<&FileNode> {
        self.arena.get(id).filter(|n| !n.is_removed()).map(|n| n.get())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id)?.parent()
    }

    /// Children in discovery order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .into_iter()
            .flat_map(move |_| id.children(&self.arena))
    }

    /// Appends `node` under `parent`. Returns `None` if `parent` is unknown or
    /// is not a directory.
    pub fn insert(&mut self, parent: NodeId, node: FileNode) -> Option<NodeId> {
        if !self.node(parent)?.is_dir {
            return None;
        }
        let id = self.arena.new_node(node);
        parent.append(id, &mut self.arena);

        // An empty cache implies empty caches on every ancestor
        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            let Some(n) = self.arena.get_mut(ancestor) else {
                break;
            };
            if !n.get_mut().invalidate() {
                break;
            }
            cursor = n.parent();
        }
        Some(id)
    }

    pub fn mark_error(&mut self, id: NodeId, kind: ScanErrorKind) {
        if let Some(n) = self.arena.get_mut(id) {
            n.get_mut().error = Some(kind);
        }
    }

    /// Own size plus the size of every descendant
    pub fn size(&self, id: NodeId) -> u64 {
        let Some(node) = self.node(id) else {
            return 0;
        };
        *node.size.get_or_init(|| {
            node.own_size + self.children(id).map(|c| self.size(c)).sum::<u64>()
        })
    }

    /// Number of descendant entries (files and directories)
    pub fn count(&self, id: NodeId) -> u64 {
        let Some(node) = self.node(id) else {
            return 0;
        };
        *node.count.get_or_init(|| {
            self.children(id).map(|c| 1 + self.count(c)).sum::<u64>()
        })
    }

    /// Number of nodes carrying an error marker
    pub fn error_count(&self) -> usize {
        self.root
            .descendants(&self.arena)
            .filter_map(|id| self.node(id))
            .filter(|n| n.error.is_some())
            .count()
    }
}
