use redtree::error::RedditClientError;
use redtree::models::{Comment, CommentSort, Thing};
use redtree::tree::{
    CommentTree, LocationHint, MoreChildrenFetcher, MoreChildrenLock, MoreChildrenRequest,
    ThreadContinuationRequest, TraversalOrder,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn comment(name: &str, parent: &str, replies: Value) -> Comment {
    serde_json::from_value(comment_json(name, parent, replies)).unwrap()
}

fn comment_json(name: &str, parent: &str, replies: Value) -> Value {
    json!({
        "id": name.trim_start_matches("t1_"),
        "name": name,
        "parent_id": parent,
        "author": "someone",
        "body": format!("body of {}", name),
        "score": 5,
        "replies": replies,
    })
}

fn more_json(parent: &str, children: &[&str]) -> Value {
    json!({
        "kind": "more",
        "data": {
            "id": "more1",
            "name": "t1_more1",
            "parent_id": parent,
            "count": children.len(),
            "children": children,
        }
    })
}

/// Root with one top-level comment "a" whose replies are all withheld behind a placeholder
fn tree_with_pending(name: &str) -> CommentTree {
    let replies = json!({
        "kind": "Listing",
        "data": {"children": [more_json(name, &["b", "x"])]}
    });
    CommentTree::new(
        "t3_sub",
        vec![comment(name, "t3_sub", replies)],
        None,
        CommentSort::Top,
    )
    .unwrap()
}

/// Fetcher that sleeps mid-request and records how many requests overlapped
struct SlowFetcher {
    lock: Arc<MoreChildrenLock>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    response: Vec<Value>,
    seen: Mutex<Vec<MoreChildrenRequest>>,
}

impl SlowFetcher {
    fn new(lock: Arc<MoreChildrenLock>, active: Arc<AtomicUsize>, max_active: Arc<AtomicUsize>) -> Self {
        Self {
            lock,
            active,
            max_active,
            response: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl MoreChildrenFetcher for SlowFetcher {
    fn more_children_lock(&self) -> &MoreChildrenLock {
        &self.lock
    }

    async fn fetch_more_children(
        &self,
        request: &MoreChildrenRequest,
    ) -> Result<Vec<Thing>, RedditClientError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(self
            .response
            .iter()
            .map(|thing| serde_json::from_value(thing.clone()).unwrap())
            .collect())
    }

    async fn fetch_thread_continuation(
        &self,
        _request: &ThreadContinuationRequest,
    ) -> Result<Vec<Thing>, RedditClientError> {
        Err(RedditClientError::ApiError("not expected".to_string()))
    }
}

#[tokio::test]
async fn splices_fetched_comments_under_the_right_parents() {
    let mut tree = tree_with_pending("t1_a");
    let a = tree.find_child("t1_a", LocationHint::Anywhere).unwrap().id();
    assert_eq!(tree[a].more_children().unwrap().count, 2);

    let mut fetcher = SlowFetcher::new(
        Arc::new(MoreChildrenLock::new()),
        Arc::default(),
        Arc::default(),
    );
    fetcher.response = vec![
        json!({"kind": "t1", "data": comment_json("t1_b", "t1_a", json!(""))}),
        json!({"kind": "t1", "data": comment_json("t1_c", "t1_b", json!(""))}),
        more_json("t1_a", &[]),
    ];

    let new = tree.load_more_comments(a, &fetcher).await.unwrap();

    assert_eq!(new.len(), 1);
    let b = &tree[new[0]];
    assert_eq!(b.fullname(), "t1_b");
    assert_eq!(b.depth(), tree[a].depth() + 1);
    assert_eq!(tree[a].children(), [b.id()]);

    assert_eq!(b.children().len(), 1);
    let c = &tree[b.children()[0]];
    assert_eq!(c.fullname(), "t1_c");
    assert_eq!(c.depth(), 3);
    for hint in LocationHint::ALL {
        assert_eq!(tree.find_child("t1_c", hint).unwrap().id(), c.id());
    }

    let pending = tree[a].more_children().unwrap();
    assert!(pending.children.is_empty());
    assert_eq!(pending.parent_id, "t1_a");

    let request = &fetcher.seen.lock().unwrap()[0];
    assert_eq!(request.link_id, "t3_sub");
    assert_eq!(request.sort, CommentSort::Top);
    assert_eq!(request.children, ["b", "x"]);

    for order in TraversalOrder::ALL {
        assert_eq!(tree.walk(order).count(), 3);
    }
}

#[tokio::test]
async fn shared_lock_serialises_requests_across_trees() {
    let lock = Arc::new(MoreChildrenLock::new());
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));

    let first = SlowFetcher::new(lock.clone(), active.clone(), max_active.clone());
    let second = SlowFetcher::new(lock.clone(), active.clone(), max_active.clone());

    let mut left = tree_with_pending("t1_a");
    let mut right = tree_with_pending("t1_z");
    let a = left.find_child("t1_a", LocationHint::Anywhere).unwrap().id();
    let z = right.find_child("t1_z", LocationHint::Anywhere).unwrap().id();

    let (l, r) = tokio::join!(
        left.load_more_comments(a, &first),
        right.load_more_comments(z, &second)
    );
    l.unwrap();
    r.unwrap();

    assert_eq!(first.seen.lock().unwrap().len(), 1);
    assert_eq!(second.seen.lock().unwrap().len(), 1);
    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn separate_locks_do_not_serialise() {
    // Sanity check for the harness above: with independent locks the requests overlap
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));

    let first = SlowFetcher::new(Arc::default(), active.clone(), max_active.clone());
    let second = SlowFetcher::new(Arc::default(), active.clone(), max_active.clone());

    let mut left = tree_with_pending("t1_a");
    let mut right = tree_with_pending("t1_z");
    let a = left.find_child("t1_a", LocationHint::Anywhere).unwrap().id();
    let z = right.find_child("t1_z", LocationHint::Anywhere).unwrap().id();

    let (l, r) = tokio::join!(
        left.load_more_comments(a, &first),
        right.load_more_comments(z, &second)
    );
    l.unwrap();
    r.unwrap();

    assert_eq!(max_active.load(Ordering::SeqCst), 2);
}
