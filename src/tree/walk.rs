use std::collections::VecDeque;

use super::{CommentNode, CommentTree, NodeId};

/// Ways a comment tree can be traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    /// Each node is returned before its subtrees, left to right
    PreOrder,
    /// Each node's subtrees are returned before the node itself
    PostOrder,
    /// All nodes at depth 1, then depth 2, and so on
    BreadthFirst,
}

impl TraversalOrder {
    pub const ALL: [TraversalOrder; 3] = [
        TraversalOrder::PreOrder,
        TraversalOrder::PostOrder,
        TraversalOrder::BreadthFirst,
    ];
}

/// Where a comment is most likely to be found, used to pick a traversal order for lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationHint {
    /// Close to the top of the tree, searched breadth-first
    NearTop,
    /// Deep in the tree, searched post-order
    NearBottom,
    /// No idea, searched pre-order
    #[default]
    Anywhere,
}

impl LocationHint {
    pub const ALL: [LocationHint; 3] = [
        LocationHint::NearTop,
        LocationHint::NearBottom,
        LocationHint::Anywhere,
    ];

    pub fn traversal_order(&self) -> TraversalOrder {
        match self {
            LocationHint::NearTop => TraversalOrder::BreadthFirst,
            LocationHint::NearBottom => TraversalOrder::PostOrder,
            LocationHint::Anywhere => TraversalOrder::PreOrder,
        }
    }
}

/// Lazy iterator over a subtree. Created by [`CommentTree::walk`] and [`CommentTree::walk_from`].
///
/// The frontier holds `(node, expanded)` pairs. Only post-order uses the flag: a node is pushed
/// back unexpanded in front of its children and yielded once they are done.
pub struct Walk<'a> {
    tree: &'a CommentTree,
    order: TraversalOrder,
    skip: Option<NodeId>,
    frontier: VecDeque<(NodeId, bool)>,
}

impl<'a> Walk<'a> {
    pub(super) fn new(
        tree: &'a CommentTree,
        start: NodeId,
        order: TraversalOrder,
        skip_start: bool,
    ) -> Self {
        let mut frontier = VecDeque::new();
        frontier.push_back((start, false));
        Self {
            tree,
            order,
            skip: skip_start.then_some(start),
            frontier,
        }
    }

    fn push_children_front(&mut self, id: NodeId) {
        for child in self.tree[id].children().iter().rev() {
            self.frontier.push_front((*child, false));
        }
    }

    fn next_id(&mut self) -> Option<NodeId> {
        match self.order {
            TraversalOrder::PreOrder => {
                let (id, _) = self.frontier.pop_front()?;
                self.push_children_front(id);
                Some(id)
            }
            TraversalOrder::BreadthFirst => {
                let (id, _) = self.frontier.pop_front()?;
                self.frontier
                    .extend(self.tree[id].children().iter().map(|child| (*child, false)));
                Some(id)
            }
            TraversalOrder::PostOrder => loop {
                let (id, expanded) = self.frontier.pop_front()?;
                if expanded || self.tree[id].children().is_empty() {
                    return Some(id);
                }
                self.frontier.push_front((id, true));
                self.push_children_front(id);
            },
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a CommentNode;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            let id = self.next_id()?;
            if Some(id) != self.skip {
                return Some(&tree[id]);
            }
        }
    }
}
