//! Hierarchical, path-addressed value store owned by the [`Hub`](crate::Hub).
//!
//! Paths are `/`-separated; a leading `/` and empty segments are ignored.
//! Segment names keep the case they were first written with but are looked
//! up case-insensitively. Intermediate branches are created on demand, and a
//! scalar that sits where a branch is needed is replaced by an empty branch.

use indexmap::IndexMap;

/// A node of the store: either a leaf value or a branch of named children.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreNode {
    Scalar(String),
    Branch(Branch),
}

impl StoreNode {
    /// The leaf value, if this node is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            StoreNode::Scalar(value) => Some(value),
            StoreNode::Branch(_) => None,
        }
    }

    /// The children, if this node is a branch.
    pub fn as_branch(&self) -> Option<&Branch> {
        match self {
            StoreNode::Branch(branch) => Some(branch),
            StoreNode::Scalar(_) => None,
        }
    }
}

/// An ordered mapping from segment name to child node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Branch {
    // lower-cased name -> (name as first written, node)
    entries: IndexMap<String, (String, StoreNode)>,
}

impl Branch {
    /// Look up a child, ignoring case.
    pub fn get(&self, name: &str) -> Option<&StoreNode> {
        self.entries.get(&name.to_lowercase()).map(|(_, node)| node)
    }

    /// Set a child, replacing any previous node with the same name.
    pub fn insert(&mut self, name: &str, node: StoreNode) {
        let slot = self
            .entries
            .entry(name.to_lowercase())
            .or_insert_with(|| (name.to_string(), StoreNode::Branch(Branch::default())));
        slot.1 = node;
    }

    /// Iterate children in first-write order, with their original names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoreNode)> {
        self.entries
            .values()
            .map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Descend into `name`, creating a branch (or replacing a scalar) as needed.
    fn child_branch(&mut self, name: &str) -> &mut Branch {
        let slot = self
            .entries
            .entry(name.to_lowercase())
            .or_insert_with(|| (name.to_string(), StoreNode::Branch(Branch::default())));
        if let StoreNode::Scalar(_) = slot.1 {
            slot.1 = StoreNode::Branch(Branch::default());
        }
        match &mut slot.1 {
            StoreNode::Branch(branch) => branch,
            StoreNode::Scalar(_) => unreachable!("scalar replaced above"),
        }
    }
}

/// The store itself: a root [`Branch`] plus path helpers.
#[derive(Debug, Clone, Default)]
pub struct PathStore {
    root: Branch,
}

impl PathStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The root branch, for read-only traversal.
    pub fn root(&self) -> &Branch {
        &self.root
    }

    /// Return the branch at `path`, creating every missing level.
    pub fn find(&mut self, path: &str) -> &mut Branch {
        segments(path).fold(&mut self.root, |branch, segment| {
            branch.child_branch(segment)
        })
    }

    /// Look up the node at `path` without creating anything.
    pub fn get(&self, path: &str) -> Option<&StoreNode> {
        let mut steps = segments(path);
        let first = steps.next()?;
        let mut node = self.root.get(first)?;
        for segment in steps {
            node = node.as_branch()?.get(segment)?;
        }
        Some(node)
    }

    /// Read the scalar stored at `path`.
    pub fn read(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(StoreNode::as_scalar)
    }

    /// Write a scalar at `path`; the last segment is the key.
    ///
    /// A path without any segment is ignored.
    pub fn write(&mut self, path: &str, value: impl Into<String>) {
        let (parent, key) = split_key(path);
        if key.is_empty() {
            return;
        }
        self.find(parent).insert(key, StoreNode::Scalar(value.into()));
    }

    /// Write `value` under `key` inside the branch at `path`.
    pub fn set(&mut self, path: &str, key: &str, value: impl Into<String>) {
        self.find(path).insert(key, StoreNode::Scalar(value.into()));
    }

    /// Depth-first walk of the whole store.
    ///
    /// Every branch is reported as `(path, None, None)` before its children;
    /// every scalar is reported as `(parent_path, Some(name), Some(value))`.
    /// A child named `[n]` is joined without a slash (`list[0]`).
    pub fn walk(&self, mut visit: impl FnMut(&str, Option<&str>, Option<&str>)) {
        walk_branch("", &self.root, &mut visit);
    }
}

fn walk_branch(
    path: &str,
    branch: &Branch,
    visit: &mut dyn FnMut(&str, Option<&str>, Option<&str>),
) {
    visit(path, None, None);
    for (name, node) in branch.iter() {
        match node {
            StoreNode::Scalar(value) => visit(path, Some(name), Some(value)),
            StoreNode::Branch(child) => walk_branch(&join_segment(path, name), child, visit),
        }
    }
}

/// Append a segment to a path; index segments (`[n]`) attach directly.
pub fn join_segment(path: &str, name: &str) -> String {
    if name.is_empty() {
        path.to_string()
    } else if name.starts_with('[') {
        format!("{path}{name}")
    } else {
        format!("{path}/{name}")
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

// "/a/b/c" -> ("/a/b", "c")
fn split_key(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
        None => ("", trimmed),
    }
}
