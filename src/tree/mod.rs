//! In-memory comment trees.
//!
//! A [`CommentTree`] owns every node of a submission's comment thread. Nodes live in an arena and
//! refer to each other by [`NodeId`], so a child's link to its parent never owns anything.
//!
//! At the root of every tree there is a placeholder node standing in for the submission. It has a
//! depth of 0 and its children are the top-level replies. Take this tree:
//!
//! ```text
//!       z
//!       |
//!       a
//!     / | \
//!    b  c  d
//!       |   \
//!     f,g,h  i
//! ```
//!
//! `z` is the root, `a` has a depth of 1 and `f`, `g`, `h` and `i` have a depth of 3. Walking the
//! tree from the root never yields `z` itself: pre-order gives `abcfghdi`, post-order `bfghcida`
//! and breadth-first `abcdfghi`.

use log::warn;
use std::fmt;
use std::ops::Index;

use crate::error::RedditClientError;
use crate::models::{is_fullname, Comment, CommentSort, MoreChildren, Reply};

pub mod more;
pub mod walk;

pub use more::{
    MoreChildrenFetcher, MoreChildrenLock, MoreChildrenRequest, ThreadContinuationRequest,
    MORE_CHILDREN_LIMIT,
};
pub use walk::{LocationHint, TraversalOrder, Walk};

const TOP_LEVEL_DEPTH: usize = 1;

/// Handle to a node inside a [`CommentTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// What a node stands for: a real comment, or the submission at the root of the tree
#[derive(Debug, Clone, PartialEq)]
pub enum NodeSubject {
    Root { submission: String },
    Comment(Comment),
}

impl NodeSubject {
    /// Fullname of the comment, or of the submission for the root
    pub fn fullname(&self) -> &str {
        match self {
            NodeSubject::Root { submission } => submission,
            NodeSubject::Comment(comment) => comment.fullname(),
        }
    }

    /// Fullname of the thing this comment replies to. The root has no parent.
    pub fn parent_id(&self) -> Result<&str, RedditClientError> {
        match self {
            NodeSubject::Root { submission } => Err(RedditClientError::InvalidState(format!(
                "No parent id on the root of {}",
                submission
            ))),
            NodeSubject::Comment(comment) => Ok(&comment.parent_id),
        }
    }

    pub fn comment(&self) -> Option<&Comment> {
        match self {
            NodeSubject::Root { .. } => None,
            NodeSubject::Comment(comment) => Some(comment),
        }
    }
}

/// One comment in a tree, with its depth, links and pending "more" placeholder
#[derive(Debug, Clone)]
pub struct CommentNode {
    id: NodeId,
    subject: NodeSubject,
    depth: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    more_children: Option<MoreChildren>,
}

impl CommentNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn subject(&self) -> &NodeSubject {
        &self.subject
    }

    /// The comment this node represents. `None` only for the root.
    pub fn comment(&self) -> Option<&Comment> {
        self.subject.comment()
    }

    pub fn fullname(&self) -> &str {
        self.subject.fullname()
    }

    /// 0 for the root, 1 for top-level replies, and so on
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Direct children, in the order Reddit returned them
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn more_children(&self) -> Option<&MoreChildren> {
        self.more_children.as_ref()
    }

    pub fn has_more_children(&self) -> bool {
        self.more_children.is_some()
    }

    pub fn is_root(&self) -> bool {
        matches!(self.subject, NodeSubject::Root { .. })
    }

    pub fn is_top_level(&self) -> bool {
        self.depth == TOP_LEVEL_DEPTH
    }

    /// Number of direct children
    pub fn immediate_size(&self) -> usize {
        self.children.len()
    }

    /// Checks if this node's placeholder is a "continue this thread" link
    pub fn is_thread_continuation(&self) -> bool {
        !self.is_root()
            && self
                .more_children
                .as_ref()
                .is_some_and(MoreChildren::is_thread_continuation)
    }
}

/// The comment tree of a single submission
#[derive(Debug, Clone)]
pub struct CommentTree {
    submission: String,
    sort: CommentSort,
    nodes: Vec<CommentNode>,
}

impl CommentTree {
    const ROOT: NodeId = NodeId(0);

    /// Build a tree from already-fetched comments. Every comment's nested replies are turned
    /// into nodes as well, one level deeper each time. No requests are made.
    ///
    /// # Arguments
    /// * `submission` - The submission's fullname (ex: t3_92dd8)
    /// * `top_level` - Top-level replies to the submission
    /// * `more` - Placeholder for top-level replies that were not returned
    /// * `sort` - Sort order used when more comments are requested
    pub fn new(
        submission: &str,
        top_level: Vec<Comment>,
        more: Option<MoreChildren>,
        sort: CommentSort,
    ) -> Result<Self, RedditClientError> {
        if !is_fullname(submission) {
            return Err(RedditClientError::InvalidFullname(submission.to_string()));
        }

        let mut tree = Self {
            submission: submission.to_string(),
            sort,
            nodes: vec![CommentNode {
                id: Self::ROOT,
                subject: NodeSubject::Root {
                    submission: submission.to_string(),
                },
                depth: 0,
                parent: None,
                children: Vec::new(),
                more_children: more,
            }],
        };

        for comment in top_level {
            tree.add_node(Self::ROOT, comment);
        }

        Ok(tree)
    }

    /// Build a tree from the children of a comment listing, which mixes comments with at most one
    /// placeholder for the remaining top-level replies
    pub fn from_replies(
        submission: &str,
        replies: Vec<Reply>,
        sort: CommentSort,
    ) -> Result<Self, RedditClientError> {
        let (comments, more) = split_replies(submission, replies);
        Self::new(submission, comments, more, sort)
    }

    /// Create a node for `comment` under `parent`, then recursively for its replies
    fn add_node(&mut self, parent: NodeId, mut comment: Comment) -> NodeId {
        let id = NodeId(self.nodes.len());
        let (replies, more) = split_replies(&comment.name, std::mem::take(&mut comment.replies));
        let depth = self.nodes[parent.0].depth + 1;

        self.nodes.push(CommentNode {
            id,
            subject: NodeSubject::Comment(comment),
            depth,
            parent: Some(parent),
            children: Vec::new(),
            more_children: more,
        });
        self.nodes[parent.0].children.push(id);

        for reply in replies {
            self.add_node(id, reply);
        }

        id
    }

    /// Fullname of the submission this tree belongs to
    pub fn submission_fullname(&self) -> &str {
        &self.submission
    }

    pub fn sort(&self) -> CommentSort {
        self.sort
    }

    /// The placeholder node standing in for the submission
    pub fn root(&self) -> &CommentNode {
        &self.nodes[Self::ROOT.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&CommentNode> {
        self.nodes.get(id.0)
    }

    /// Number of comments in the tree, not counting the root
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of direct children of a node
    pub fn immediate_size(&self, id: NodeId) -> Result<usize, RedditClientError> {
        Ok(self.node(id)?.immediate_size())
    }

    /// Number of descendants of a node, not counting the node itself
    pub fn total_size(&self, id: NodeId) -> Result<usize, RedditClientError> {
        self.node(id)?;
        Ok(Walk::new(self, id, TraversalOrder::PreOrder, true).count())
    }

    /// Walk every comment in the tree. The root is never included.
    pub fn walk(&self, order: TraversalOrder) -> Walk<'_> {
        Walk::new(self, Self::ROOT, order, true)
    }

    /// Walk the subtree starting at `id`, including `id` itself unless it is the root
    pub fn walk_from(
        &self,
        id: NodeId,
        order: TraversalOrder,
    ) -> Result<Walk<'_>, RedditClientError> {
        self.node(id)?;
        Ok(Walk::new(self, id, order, id == Self::ROOT))
    }

    /// Find a comment anywhere in the tree by its fullname (ex: t1_c0b75sp)
    pub fn find_child(&self, fullname: &str, hint: LocationHint) -> Option<&CommentNode> {
        self.walk(hint.traversal_order())
            .find(|node| node.fullname() == fullname)
    }

    /// Find a comment in the subtree starting at `id`. This is a linear scan in the order the
    /// hint suggests.
    pub fn find_descendant(
        &self,
        id: NodeId,
        fullname: &str,
        hint: LocationHint,
    ) -> Result<Option<&CommentNode>, RedditClientError> {
        Ok(self
            .walk_from(id, hint.traversal_order())?
            .find(|node| node.fullname() == fullname))
    }

    /// Fullname of the thing the comment at `id` replies to
    pub fn parent_comment_id(&self, id: NodeId) -> Result<&str, RedditClientError> {
        self.node(id)?.subject.parent_id()
    }

    fn node(&self, id: NodeId) -> Result<&CommentNode, RedditClientError> {
        self.get(id).ok_or_else(|| {
            RedditClientError::InvalidState(format!(
                "Node {:?} does not belong to the tree of {}",
                id, self.submission
            ))
        })
    }

    /// Climb from `start` towards the root until a node with the given fullname is found
    fn climb_to(&self, start: NodeId, fullname: &str) -> Option<NodeId> {
        let mut current = Some(start);
        while let Some(id) = current {
            let node = &self.nodes[id.0];
            if node.fullname() == fullname {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    /// Render the subtree at `id`, one line per comment, indented by depth. Useful for debugging.
    pub fn visualize<Tz: chrono::TimeZone>(
        &self,
        id: NodeId,
        tz: &Tz,
    ) -> Result<String, RedditClientError>
    where
        Tz::Offset: fmt::Display,
    {
        // The root itself is not rendered, so its children start unindented
        let base_depth = if id == Self::ROOT {
            self.root().depth + 1
        } else {
            self.node(id)?.depth
        };

        let mut output = String::new();
        for node in self.walk_from(id, TraversalOrder::PreOrder)? {
            let indent = "  ".repeat(node.depth - base_depth);
            if let Some(comment) = node.comment() {
                output.push_str(&format!(
                    "{}{} ({}↑) [{}]: {}\n",
                    indent,
                    comment.author,
                    comment.score,
                    comment.format_timestamp(tz),
                    comment.body.replace('\n', "\\n").replace('\r', "\\r")
                ));
            }
            if let Some(more) = node.more_children() {
                output.push_str(&format!("{}  [+{} more]\n", indent, more.count));
            }
        }

        if id == Self::ROOT {
            if let Some(more) = self.root().more_children() {
                output.push_str(&format!("[+{} more top-level replies]\n", more.count));
            }
        }

        Ok(output)
    }
}

impl Index<NodeId> for CommentTree {
    type Output = CommentNode;

    fn index(&self, id: NodeId) -> &CommentNode {
        &self.nodes[id.0]
    }
}

/// Separate the comments of a listing from its placeholder. Reddit sends at most one
/// placeholder per listing; extras are dropped.
fn split_replies(parent: &str, replies: Vec<Reply>) -> (Vec<Comment>, Option<MoreChildren>) {
    let mut comments = Vec::with_capacity(replies.len());
    let mut more = None;

    for reply in replies {
        match reply {
            Reply::Comment(comment) => comments.push(*comment),
            Reply::More(extra) if more.is_some() => {
                warn!("Ignoring extra MoreChildren under {}: {:?}", parent, extra)
            }
            Reply::More(placeholder) => more = Some(placeholder),
        }
    }

    (comments, more)
}
