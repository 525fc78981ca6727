// Post record shared by the cache, the store, and the gateway.
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};

/// Identifier boundary: ids `1..=DEFAULT_BOUNDARY` belong to the remote
/// service, anything above is allocated locally.
pub const DEFAULT_BOUNDARY: u64 = 100;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub body: String,
}

impl Post {
    pub fn new(id: u64, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Title/body pair after trimming; both are guaranteed non-empty.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Draft {
    pub title: String,
    pub body: String,
}

impl Draft {
    pub fn parse(title: &str, body: &str) -> Result<Self, Error> {
        let title = title.trim();
        let body = body.trim();
        if title.is_empty() || body.is_empty() {
            return Err(Error::new(ErrorKind::Validation)
                .with_message("title and body are required")
                .with_hint("Provide a non-blank title and body."));
        }
        Ok(Self {
            title: title.to_string(),
            body: body.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Draft, Post};
    use crate::core::error::ErrorKind;

    #[test]
    fn draft_trims_both_fields() {
        let draft = Draft::parse("  hello ", "\tworld\n").expect("draft");
        assert_eq!(draft.title, "hello");
        assert_eq!(draft.body, "world");
    }

    #[test]
    fn draft_rejects_blank_fields() {
        for (title, body) in [("", "b"), ("t", ""), ("   ", "b"), ("t", " \n ")] {
            let err = Draft::parse(title, body).expect_err("blank");
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn post_ignores_unknown_fields() {
        let post: Post =
            serde_json::from_str(r#"{"userId":1,"id":3,"title":"t","body":"b"}"#).expect("post");
        assert_eq!(post, Post::new(3, "t", "b"));
    }

    #[test]
    fn post_requires_every_field() {
        assert!(serde_json::from_str::<Post>(r#"{"id":3,"title":"t"}"#).is_err());
        assert!(serde_json::from_str::<Post>(r#"{"title":"t","body":"b"}"#).is_err());
        assert!(serde_json::from_str::<Post>(r#"{"id":"x","title":"t","body":"b"}"#).is_err());
    }
}
