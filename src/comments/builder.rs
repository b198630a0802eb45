use crate::records::{Comment, CommentData};
use std::collections::{HashMap, HashSet};

/// One comment in the flat extraction, with its structural links
#[derive(Debug, Clone, PartialEq)]
pub struct FlatComment {
    pub data: CommentData,
    /// Parent comment id, `None` for a top-level comment
    pub parent_id: Option<String>,
    /// Reply ids in page order
    pub child_ids: Vec<String>,
}

impl FlatComment {
    pub fn new(data: CommentData, parent_id: Option<String>, child_ids: Vec<String>) -> Self {
        Self {
            data,
            parent_id,
            child_ids,
        }
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }
}

/// Comments keyed by id, iterated in extraction order
///
/// The first entry for an id wins; later duplicates are ignored.
#[derive(Debug, Clone, Default)]
pub struct FlatCommentMap {
    entries: Vec<FlatComment>,
    index: HashMap<String, usize>,
}

impl FlatCommentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a comment; returns false if its id was already present
    pub fn insert(&mut self, comment: FlatComment) -> bool {
        if self.index.contains_key(comment.id()) {
            return false;
        }
        self.index
            .insert(comment.id().to_string(), self.entries.len());
        self.entries.push(comment);
        true
    }

    pub fn get(&self, id: &str) -> Option<&FlatComment> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// Mutable access, used to append child ids while flattening
    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut FlatComment> {
        match self.index.get(id) {
            Some(&i) => self.entries.get_mut(i),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlatComment> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<FlatComment> for FlatCommentMap {
    fn from_iter<I: IntoIterator<Item = FlatComment>>(iter: I) -> Self {
        let mut map = FlatCommentMap::new();
        for comment in iter {
            map.insert(comment);
        }
        map
    }
}

/// A comment with its replies, in page order
#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub comment: Comment,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn id(&self) -> &str {
        self.comment.id()
    }

    /// Number of comments in this subtree, including this one
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(CommentNode::len).sum::<usize>()
    }

    /// Pre-order traversal yielding each node with its depth (root is 0)
    pub fn iter_depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            stack: vec![(self, 0)],
        }
    }
}

/// Pre-order iterator over a comment subtree
pub struct DepthFirst<'a> {
    stack: Vec<(&'a CommentNode, usize)>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = (&'a CommentNode, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth) = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push((child, depth + 1));
        }
        Some((node, depth))
    }
}

/// Builds reply trees from a flat comment extraction
pub struct CommentTreeBuilder;

impl CommentTreeBuilder {
    /// Builds the ordered root list for a post
    ///
    /// Roots are the entries without a parent, in extraction order. Children
    /// follow each entry's `child_ids` order. Ids missing from the map are
    /// skipped, and a node is never entered twice, so malformed or cyclic
    /// input still terminates.
    ///
    /// # Arguments
    ///
    /// * `flat` - Comments keyed by id
    /// * `post_id` - Post stamped onto every emitted comment
    pub fn build(flat: &FlatCommentMap, post_id: &str) -> Vec<CommentNode> {
        let mut visited: HashSet<&str> = HashSet::with_capacity(flat.len());
        let mut roots = Vec::new();

        for entry in flat.iter().filter(|e| e.parent_id.is_none()) {
            if let Some(node) = Self::build_node(flat, entry, post_id, &mut visited) {
                roots.push(node);
            }
        }

        let placed: usize = roots.iter().map(CommentNode::len).sum();
        if placed < flat.len() {
            tracing::debug!(
                "Post {}: {} of {} comments unreachable from a root",
                post_id,
                flat.len() - placed,
                flat.len()
            );
        }

        roots
    }

    fn build_node<'a>(
        flat: &'a FlatCommentMap,
        entry: &'a FlatComment,
        post_id: &str,
        visited: &mut HashSet<&'a str>,
    ) -> Option<CommentNode> {
        if !visited.insert(entry.id()) {
            tracing::debug!("Comment {} already placed, not entering again", entry.id());
            return None;
        }

        let mut children = Vec::with_capacity(entry.child_ids.len());
        for child_id in &entry.child_ids {
            match flat.get(child_id) {
                Some(child) => {
                    if let Some(node) = Self::build_node(flat, child, post_id, visited) {
                        children.push(node);
                    }
                }
                None => tracing::debug!(
                    "Comment {} lists missing reply {}, skipping",
                    entry.id(),
                    child_id
                ),
            }
        }

        Some(CommentNode {
            comment: Comment {
                post_id: post_id.to_string(),
                data: entry.data.clone(),
            },
            children,
        })
    }
}
