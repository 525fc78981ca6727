// Ordered post collection (newest first) holding everything this client knows locally.
use std::collections::HashSet;

use tracing::warn;

use crate::core::error::{Error, ErrorKind};
use crate::core::post::Post;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResourceCache {
    posts: Vec<Post>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn insert_front(&mut self, post: Post) -> Result<(), Error> {
        if self.find_by_id(post.id).is_some() {
            return Err(Error::new(ErrorKind::Internal)
                .with_message("post id already cached")
                .with_id(post.id));
        }
        self.posts.insert(0, post);
        Ok(())
    }

    /// Upsert: keeps the slot of an existing entry, otherwise prepends.
    pub fn replace(&mut self, id: u64, post: Post) {
        match self.posts.iter_mut().find(|cached| cached.id == id) {
            Some(slot) => *slot = post,
            None => self.posts.insert(0, post),
        }
    }

    pub fn update_fields(&mut self, id: u64, title: &str, body: &str) -> Option<&Post> {
        let post = self.posts.iter_mut().find(|post| post.id == id)?;
        post.title = title.to_string();
        post.body = body.to_string();
        Some(post)
    }

    pub fn remove_by_id(&mut self, id: u64) -> bool {
        let before = self.posts.len();
        self.posts.retain(|post| post.id != id);
        self.posts.len() != before
    }

    pub fn snapshot(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn max_id(&self) -> Option<u64> {
        self.posts.iter().map(|post| post.id).max()
    }

    pub fn restore(&mut self, posts: Vec<Post>) {
        let mut seen = HashSet::with_capacity(posts.len());
        let total = posts.len();
        self.posts = posts
            .into_iter()
            .filter(|post| seen.insert(post.id))
            .collect();
        if self.posts.len() != total {
            warn!(
                dropped = total - self.posts.len(),
                "dropped duplicate post ids from restored collection"
            );
        }
    }

    pub fn clear(&mut self) {
        self.posts.clear();
    }
}
