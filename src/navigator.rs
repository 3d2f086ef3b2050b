use crate::{error::NavigationMisuse, file_node::FileTree};
use indextree::NodeId;
use std::cmp::Reverse;

/// One row of a view as the renderer sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    /// The "go up" affordance, always first when shown
    Up,
    Entry(NodeId),
}

/// A navigator stack frame: one directory's children in display order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    dir: NodeId,
    entries: Vec<NodeId>,
    has_up: bool,
}

impl View {
    /// Children of `dir` sorted by descending aggregated size. The sort is
    /// stable, so equal sizes keep discovery order.
    fn build(tree: &FileTree, dir: NodeId) -> Self {
        let mut entries: Vec<NodeId> = tree.children(dir).collect();
        entries.sort_by_key(|id| Reverse(tree.size(*id)));
        Self {
            dir,
            entries,
            has_up: tree.parent(dir).is_some(),
        }
    }

    pub fn dir(&self) -> NodeId {
        self.dir
    }

    pub fn entries(&self) -> &[NodeId] {
        &self.entries
    }

    pub fn has_up(&self) -> bool {
        self.has_up
    }

    pub fn row_count(&self) -> usize {
        self.entries.len() + usize::from(self.has_up)
    }

    pub fn row(&self, index: usize) -> Option<Row> {
        match (self.has_up, index) {
            (true, 0) => Some(Row::Up),
            (true, i) => self.entries.get(i - 1).copied().map(Row::Entry),
            (false, i) => self.entries.get(i).copied().map(Row::Entry),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        self.has_up
            .then_some(Row::Up)
            .into_iter()
            .chain(self.entries.iter().copied().map(Row::Entry))
    }
}

/// Drill-down history over a scanned tree. The root view is kept apart from
/// the pushed frames so the stack can never become empty.
#[derive(Debug)]
pub struct Navigator {
    tree: FileTree,
    base: View,
    pushed: Vec<View>,
}

impl Navigator {
    pub fn new(tree: FileTree) -> Self {
        let base = View::build(&tree, tree.root());
        Self {
            tree,
            base,
            pushed: Vec::new(),
        }
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn current(&self) -> &View {
        self.pushed.last().unwrap_or(&self.base)
    }

    /// Number of views on the stack, root view included
    pub fn depth(&self) -> usize {
        self.pushed.len() + 1
    }

    /// Drill into `node`. Only directories can be entered.
    pub fn push(&mut self, node: NodeId) -> Result<(), NavigationMisuse> {
        let target = self.tree.node(node).ok_or(NavigationMisuse::UnknownNode)?;
        if !target.is_dir {
            return Err(NavigationMisuse::NotADirectory);
        }
        let view = View::build(&self.tree, node);
        self.pushed.push(view);
        Ok(())
    }

    /// Return to the view below the current one, exactly as it was
    pub fn pop(&mut self) -> Result<(), NavigationMisuse> {
        self.pushed.pop().map(|_| ()).ok_or(NavigationMisuse::AtRoot)
    }

    /// Push a fresh view over the tree parent of the current directory. This
    /// is not `pop`: the result is re-derived from the tree and need not match
    /// the frame underneath.
    pub fn go_up(&mut self) -> Result<(), NavigationMisuse> {
        let parent = self
            .tree
            .parent(self.current().dir())
            .ok_or(NavigationMisuse::NoParent)?;
        self.push(parent)
    }

    /// Selection handler for a rendered row
    pub fn activate(&mut self, row: usize) -> Result<(), NavigationMisuse> {
        match self.current().row(row) {
            Some(Row::Up) => self.go_up(),
            Some(Row::Entry(id)) => self.push(id),
            None => Err(NavigationMisuse::NoSuchRow(row)),
        }
    }
}
