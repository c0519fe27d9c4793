use serde::Deserialize;

/// Id Reddit gives to "continue this thread" placeholders
const CONTINUE_THREAD_ID: &str = "_";

/// A list of comment ids that Reddit did not include in a response. It marks the spot in the
/// tree where more replies exist and carries what is needed to fetch them later.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MoreChildren {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Fullname of the comment (or submission) the missing comments should be appended under
    pub parent_id: String,
    #[serde(default)]
    pub count: usize,
    /// Ids of the comments that were not included
    #[serde(default)]
    pub children: Vec<String>,
}

impl MoreChildren {
    pub fn new(parent_id: &str, children: Vec<String>) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            parent_id: parent_id.to_string(),
            count: children.len(),
            children,
        }
    }

    /// A "continue this thread" link. Reddit uses these when a branch gets too deep. Current
    /// responses send an id of `_` with no children; older ones have a count of zero and list
    /// only the placeholder's own id.
    pub fn is_thread_continuation(&self) -> bool {
        if self.children.is_empty() {
            return self.id == CONTINUE_THREAD_ID;
        }
        self.count == 0 && self.children[0] == self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_thread_continuations() {
        let more: MoreChildren = serde_json::from_value(json!({
            "id": "_", "name": "t1__", "parent_id": "t1_deep", "count": 0, "children": []
        }))
        .unwrap();
        assert!(more.is_thread_continuation());

        let more: MoreChildren = serde_json::from_value(json!({
            "id": "k9", "name": "t1_k9", "parent_id": "t1_deep", "count": 0, "children": ["k9"]
        }))
        .unwrap();
        assert!(more.is_thread_continuation());

        let more = MoreChildren::new("t1_a", Vec::new());
        assert!(!more.is_thread_continuation());

        let more = MoreChildren::new("t1_a", vec!["x".to_string(), "y".to_string()]);
        assert_eq!(more.count, 2);
        assert!(!more.is_thread_continuation());
    }
}
