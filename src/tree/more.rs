use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use tokio::sync::{Mutex, MutexGuard};

use super::{CommentNode, CommentTree, NodeId, TraversalOrder};
use crate::error::RedditClientError;
use crate::models::{strip_kind, Comment, CommentSort, MoreChildren, Reply, Thing};

/// The most ids Reddit accepts in a single morechildren request
pub const MORE_CHILDREN_LIMIT: usize = 100;

/// Parameters for a `/api/morechildren` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoreChildrenRequest {
    /// Fullname of the submission (ex: t3_92dd8)
    pub link_id: String,
    pub sort: CommentSort,
    /// Comment ids to expand, at most [`MORE_CHILDREN_LIMIT`]
    pub children: Vec<String>,
}

/// Parameters for fetching the rest of a "continue this thread" branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadContinuationRequest {
    pub link_id: String,
    pub sort: CommentSort,
    /// Id (not fullname) of the comment whose replies are wanted
    pub focus: String,
}

/// Serialises morechildren requests. Reddit answers concurrent requests to that endpoint with an
/// error, so every fetcher sharing a lock waits its turn.
#[derive(Debug, Default)]
pub struct MoreChildrenLock {
    inner: Mutex<()>,
}

impl MoreChildrenLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }
}

/// Source of comments that were left out of a listing.
///
/// Both fetch methods return things as if they had been visited in pre-order traversal. Each
/// thing should be a comment (`t1`) or a placeholder (`more`); anything else is rejected by the
/// tree before it is modified.
#[allow(async_fn_in_trait)]
pub trait MoreChildrenFetcher {
    /// The lock every morechildren request made through this fetcher must hold
    fn more_children_lock(&self) -> &MoreChildrenLock;

    async fn fetch_more_children(
        &self,
        request: &MoreChildrenRequest,
    ) -> Result<Vec<Thing>, RedditClientError>;

    /// Fetch the replies to `request.focus`
    async fn fetch_thread_continuation(
        &self,
        request: &ThreadContinuationRequest,
    ) -> Result<Vec<Thing>, RedditClientError>;
}

/// Comments and placeholders fetched for one placeholder, in the order they arrived
struct Fetched {
    comments: Vec<Comment>,
    mores: Vec<MoreChildren>,
}

impl CommentTree {
    /// Fetch the comments behind a node's placeholder and splice them into the tree.
    ///
    /// Returns only the new direct children of `id`; deeper comments are attached but not
    /// returned. A node without a placeholder is left alone and an empty list is returned.
    ///
    /// If the fetch fails, or returns something other than comments and placeholders, the tree
    /// is not modified. Comments and placeholders whose parent cannot be found are logged and
    /// skipped.
    pub async fn load_more_comments<F>(
        &mut self,
        id: NodeId,
        fetcher: &F,
    ) -> Result<Vec<NodeId>, RedditClientError>
    where
        F: MoreChildrenFetcher,
    {
        Ok(self.replace_more(id, fetcher).await?.unwrap_or_default())
    }

    /// Fetch the comments behind a node's placeholder into a new tree, leaving this one alone.
    ///
    /// The new tree's root is a copy of the node at `id` with the same depth, and the fetched
    /// comments hang below it. Fails with `InvalidState` if the node has no placeholder.
    pub async fn load_more<F>(
        &self,
        id: NodeId,
        fetcher: &F,
    ) -> Result<CommentTree, RedditClientError>
    where
        F: MoreChildrenFetcher,
    {
        let node = self.node(id)?;
        if !node.has_more_children() {
            return Err(RedditClientError::InvalidState(format!(
                "{} has no more children",
                node.fullname()
            )));
        }

        let mut detached = CommentTree {
            submission: self.submission.clone(),
            sort: self.sort,
            nodes: vec![CommentNode {
                id: Self::ROOT,
                subject: node.subject.clone(),
                depth: node.depth,
                parent: None,
                children: Vec::new(),
                more_children: None,
            }],
        };

        if let Some(fetched) = self.request_more(id, fetcher).await? {
            detached.attach(Self::ROOT, fetched);
        }
        Ok(detached)
    }

    /// Load the placeholder at `id` into this tree. `None` means no request was needed, either
    /// because there is no placeholder or because it had nothing left to ask for.
    async fn replace_more<F>(
        &mut self,
        id: NodeId,
        fetcher: &F,
    ) -> Result<Option<Vec<NodeId>>, RedditClientError>
    where
        F: MoreChildrenFetcher,
    {
        let fetched = self.request_more(id, fetcher).await?;

        // Only a successful fetch gets this far
        self.nodes[id.0].more_children = None;
        Ok(fetched.map(|fetched| self.attach(id, fetched)))
    }

    /// Ask the fetcher for what is behind the placeholder at `id` without touching the tree
    async fn request_more<F>(
        &self,
        id: NodeId,
        fetcher: &F,
    ) -> Result<Option<Fetched>, RedditClientError>
    where
        F: MoreChildrenFetcher,
    {
        let node = self.node(id)?;
        let Some(more) = node.more_children() else {
            return Ok(None);
        };
        let fullname = node.fullname();
        let continuation = node.is_thread_continuation();

        if !continuation && more.children.is_empty() {
            debug!("Placeholder below {} has nothing left to load", fullname);
            return Ok(None);
        }

        let _guard = fetcher.more_children_lock().acquire().await;

        let (things, leftover) = if continuation {
            let request = ThreadContinuationRequest {
                link_id: self.submission.clone(),
                sort: self.sort,
                focus: strip_kind(fullname).to_string(),
            };
            debug!("Continuing thread below {}", fullname);
            (fetcher.fetch_thread_continuation(&request).await?, Vec::new())
        } else {
            let split = more.children.len().min(MORE_CHILDREN_LIMIT);
            let request = MoreChildrenRequest {
                link_id: self.submission.clone(),
                sort: self.sort,
                children: more.children[..split].to_vec(),
            };
            debug!(
                "Requesting {} of {} more children below {}",
                request.children.len(),
                more.children.len(),
                fullname
            );
            (
                fetcher.fetch_more_children(&request).await?,
                more.children[split..].to_vec(),
            )
        };

        let (comments, mut mores) = partition(things)?;

        if !leftover.is_empty() {
            match mores.iter_mut().find(|m| m.parent_id == fullname) {
                Some(next) => {
                    let mut children = leftover;
                    children.append(&mut next.children);
                    next.count = children.len();
                    next.children = children;
                }
                None => mores.push(MoreChildren {
                    count: leftover.len(),
                    children: leftover,
                    parent_id: fullname.to_string(),
                    ..more.clone()
                }),
            }
        }

        Ok(Some(Fetched { comments, mores }))
    }

    fn attach(&mut self, id: NodeId, fetched: Fetched) -> Vec<NodeId> {
        let new_children = self.attach_comments(id, fetched.comments);
        self.attach_mores(fetched.mores);

        debug!(
            "Loaded {} new direct children below {}",
            new_children.len(),
            self.nodes[id.0].fullname()
        );
        new_children
    }

    /// Attach fetched comments, which arrive in pre-order. Each comment is expected at or below
    /// the previous one, so the search for its parent climbs up from there.
    fn attach_comments(&mut self, id: NodeId, comments: Vec<Comment>) -> Vec<NodeId> {
        let direct_depth = self.nodes[id.0].depth + 1;
        let mut insertion_point = id;
        let mut new_children = Vec::new();

        for comment in comments {
            match self.climb_to(insertion_point, &comment.parent_id) {
                Some(parent) => {
                    let node = self.add_node(parent, comment);
                    if self.nodes[node.0].depth == direct_depth {
                        new_children.push(node);
                    }
                    insertion_point = node;
                }
                None => warn!(
                    "Unable to find parent {} for comment {}",
                    comment.parent_id, comment.name
                ),
            }
        }

        new_children
    }

    /// Give each fetched placeholder to the node it belongs to
    fn attach_mores(&mut self, mores: Vec<MoreChildren>) {
        let mut by_parent: HashMap<String, MoreChildren> = HashMap::new();
        for more in mores {
            if let Some(replaced) = by_parent.insert(more.parent_id.clone(), more) {
                warn!("Dropping duplicate MoreChildren: {:?}", replaced);
            }
        }

        // The root is never walked, so it is checked by name first
        let root_name = self.root().fullname().to_string();
        if let Some(more) = by_parent.remove(&root_name) {
            self.nodes[Self::ROOT.0].more_children = Some(more);
        }
        if by_parent.is_empty() {
            return;
        }

        let targets: Vec<NodeId> = self
            .walk(TraversalOrder::PreOrder)
            .filter(|node| by_parent.contains_key(node.fullname()))
            .map(|node| node.id())
            .collect();

        for target in targets {
            let key = self.nodes[target.0].fullname().to_string();
            self.nodes[target.0].more_children = by_parent.remove(&key);
        }

        for more in by_parent.into_values() {
            warn!("Unable to find parent for {:?}", more);
        }
    }

    /// Expand the tree below `id` by loading every placeholder found there.
    ///
    /// This node's own placeholder is loaded first, then the subtree is visited breadth-first,
    /// including comments added along the way. One request is sent per placeholder, so large
    /// threads can take a while without limits.
    ///
    /// # Arguments
    /// * `depth_limit` - Stop at nodes deeper than this (`None` for no limit)
    /// * `request_limit` - Stop after this many requests (`None` for no limit)
    ///
    /// # Returns
    /// The number of requests sent
    pub async fn load_fully<F>(
        &mut self,
        id: NodeId,
        fetcher: &F,
        depth_limit: Option<usize>,
        request_limit: Option<usize>,
    ) -> Result<usize, RedditClientError>
    where
        F: MoreChildrenFetcher,
    {
        self.node(id)?;
        let mut requests = 0;
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            if current != id && depth_limit.is_some_and(|limit| self[current].depth > limit) {
                break;
            }

            while let Some(before) = self[current].more_children().cloned() {
                if request_limit.is_some_and(|limit| requests >= limit) {
                    debug!("Request limit of {} reached", requests);
                    return Ok(requests);
                }
                if self.replace_more(current, fetcher).await?.is_none() {
                    break;
                }
                requests += 1;

                if self[current].more_children() == Some(&before) {
                    warn!(
                        "Placeholder below {} did not change after loading, skipping it",
                        self[current].fullname()
                    );
                    break;
                }
            }

            queue.extend(self[current].children().iter().copied());
        }

        Ok(requests)
    }
}

/// Split fetched things into comments and placeholders, keeping their order. Fails on the first
/// thing that is neither.
fn partition(things: Vec<Thing>) -> Result<(Vec<Comment>, Vec<MoreChildren>), RedditClientError> {
    let mut comments = Vec::new();
    let mut mores = Vec::new();

    for thing in things {
        match thing.into_reply()? {
            Reply::Comment(comment) => comments.push(*comment),
            Reply::More(more) => mores.push(more),
        }
    }

    Ok((comments, mores))
}
