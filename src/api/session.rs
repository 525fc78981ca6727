//! Purpose: Caller-owned session bundling engine collaborators with live state.
//! Exports: `Session`, `SessionConfig`, `Limits`, `BoxedSession`.
//! Role: Entry point for the CLI and embedders; one session per active user.
//! Invariants: State is restored at most once, when the session opens.
//! Invariants: Sessions opened without restore never read the stored collection.
//! Invariants: All mutations route through `ReconciliationEngine`.
#![allow(clippy::result_large_err)]

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use super::remote::{DEFAULT_BASE_URL, HttpGateway};
use crate::core::engine::{Outcome, ReconciliationEngine, Renderer, SessionState};
use crate::core::error::Error;
use crate::core::gateway::NetworkGateway;
use crate::core::post::{DEFAULT_BOUNDARY, Post};
use crate::core::store::{FileStore, MemoryStore, PersistentStore};
use crate::state_paths::default_state_dir;

pub type ApiResult<T> = Result<T, Error>;

pub type BoxedSession = Session<HttpGateway, Box<dyn PersistentStore>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Limits {
    pub boundary: u64,
    pub next: u64,
}

impl Limits {
    pub fn valid_range(&self) -> (u64, u64) {
        (1, self.next)
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub state_dir: PathBuf,
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub ephemeral: bool,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            state_dir: default_state_dir(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            ephemeral: false,
        }
    }

    pub fn with_state_dir(mut self, state_dir: impl Into<PathBuf>) -> Self {
        self.state_dir = state_dir.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    /// Build the HTTP gateway and store this config describes, then restore state.
    pub fn open(&self) -> ApiResult<BoxedSession> {
        Session::open(self.gateway()?, self.store())
    }

    /// Like `open`, but starts from default state without reading the store.
    /// Used by `reset` and `fetch`, which must work even when stored state is corrupt.
    pub fn open_unrestored(&self) -> ApiResult<BoxedSession> {
        Ok(Session::unrestored(self.gateway()?, self.store()))
    }

    fn gateway(&self) -> ApiResult<HttpGateway> {
        let mut gateway = HttpGateway::new(self.base_url.clone())?;
        if let Some(timeout) = self.timeout {
            gateway = gateway.with_timeout(timeout);
        }
        debug!(base_url = %gateway.base_url(), "using posts service");
        Ok(gateway)
    }

    fn store(&self) -> Box<dyn PersistentStore> {
        if self.ephemeral {
            return Box::new(MemoryStore::new());
        }
        let store = FileStore::new(&self.state_dir);
        debug!(dir = %store.dir().display(), "using state directory");
        Box::new(store)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Session<G, S> {
    engine: ReconciliationEngine<G, S>,
    state: SessionState,
}

impl<G, S> Session<G, S>
where
    G: NetworkGateway,
    S: PersistentStore,
{
    pub fn open(gateway: G, store: S) -> ApiResult<Self> {
        Self::open_with_boundary(gateway, store, DEFAULT_BOUNDARY)
    }

    pub fn open_with_boundary(gateway: G, store: S, boundary: u64) -> ApiResult<Self> {
        let mut engine = ReconciliationEngine::new(gateway, store);
        let state = engine.load(boundary)?;
        Ok(Self { engine, state })
    }

    /// Session over `store` with default state; nothing is read from the store.
    /// Mutating operations other than `reset` would overwrite what it holds.
    pub fn unrestored(gateway: G, store: S) -> Self {
        Self {
            engine: ReconciliationEngine::new(gateway, store),
            state: SessionState::with_boundary(DEFAULT_BOUNDARY),
        }
    }

    pub fn with_renderer(self, renderer: impl Renderer + 'static) -> Self {
        Self {
            engine: self.engine.with_renderer(renderer),
            state: self.state,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &S {
        self.engine.store()
    }

    pub fn gateway(&self) -> &G {
        self.engine.gateway()
    }

    pub fn create(&mut self, title: &str, body: &str) -> ApiResult<Outcome> {
        self.engine.create(&mut self.state, title, body)
    }

    pub fn update(&mut self, id: u64, title: &str, body: &str) -> ApiResult<Outcome> {
        self.engine.update(&mut self.state, id, title, body)
    }

    pub fn delete(&mut self, id: u64) -> ApiResult<Outcome> {
        self.engine.delete(&mut self.state, id)
    }

    pub fn fetch(&self, id: u64) -> ApiResult<Post> {
        self.engine.fetch(id)
    }

    pub fn reset(&mut self) {
        self.engine.reset(&mut self.state);
    }

    /// Cached copy only; never touches the network.
    pub fn lookup(&self, id: u64) -> Option<&Post> {
        self.state.cache().find_by_id(id)
    }

    pub fn posts(&self) -> &[Post] {
        self.state.cache().snapshot()
    }

    pub fn limits(&self) -> Limits {
        Limits {
            boundary: self.state.ids().boundary(),
            next: self.state.ids().next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionConfig};
    use crate::core::error::{Error, ErrorKind};
    use crate::core::gateway::NetworkGateway;
    use crate::core::post::Post;
    use crate::core::store::{FileStore, PersistentStore};
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingGateway {
        calls: Cell<usize>,
        fail_status: Cell<Option<u16>>,
    }

    impl CountingGateway {
        fn hit(&self) -> Result<(), Error> {
            self.calls.set(self.calls.get() + 1);
            match self.fail_status.get() {
                Some(status) => Err(Error::remote(status)),
                None => Ok(()),
            }
        }
    }

    impl NetworkGateway for CountingGateway {
        fn create(&self, title: &str, body: &str) -> Result<Post, Error> {
            self.hit()?;
            Ok(Post::new(1, title, body))
        }

        fn read(&self, id: u64) -> Result<Post, Error> {
            self.hit()?;
            Ok(Post::new(id, "r", "r"))
        }

        fn update(&self, id: u64, title: &str, body: &str) -> Result<Post, Error> {
            self.hit()?;
            Ok(Post::new(id, title, body))
        }

        fn delete(&self, _id: u64) -> Result<(), Error> {
            self.hit()
        }
    }

    #[test]
    fn scenarios_a_through_e_against_file_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gateway = CountingGateway::default();
        let mut session =
            Session::open(&gateway, FileStore::new(dir.path())).expect("open session");

        // fresh create gets the first local id
        let created = session.create("T", "B").expect("create");
        assert_eq!(created.post.map(|p| p.id), Some(101));
        assert_eq!(session.limits().next, 101);

        // local update stays off the network
        session.update(101, "T2", "B2").expect("update");
        assert_eq!(session.lookup(101).map(|p| p.title.as_str()), Some("T2"));
        assert_eq!(gateway.calls.get(), 1);

        // remote failure surfaces the status and keeps the cache
        gateway.fail_status.set(Some(404));
        let err = session.update(5, "X", "Y").expect_err("remote");
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(err.status(), Some(404));
        assert!(session.lookup(5).is_none());
        gateway.fail_status.set(None);

        // local delete is idempotent and persisted
        session.delete(101).expect("delete");
        assert!(session.lookup(101).is_none());
        assert_eq!(session.store().collection().expect("collection"), Some(vec![]));
        session.delete(101).expect("delete again");
        assert!(session.posts().is_empty());

        // reset returns to defaults
        session.reset();
        assert_eq!(session.limits().next, 100);
        assert!(session.posts().is_empty());
        assert_eq!(session.store().counter().expect("counter"), None);
        assert_eq!(session.store().collection().expect("collection"), None);
    }

    #[test]
    fn reopening_restores_counter_and_collection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gateway = CountingGateway::default();
        {
            let mut session = Session::open(&gateway, FileStore::new(dir.path())).expect("open");
            session.create("first", "one").expect("create");
            session.create("second", "two").expect("create");
            session.update(3, "remote", "three").expect("update");
        }

        let mut session = Session::open(&gateway, FileStore::new(dir.path())).expect("reopen");
        let ids: Vec<u64> = session.posts().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 102, 101]);
        assert_eq!(session.limits().next, 102);
        assert_eq!(session.limits().valid_range(), (1, 102));

        let created = session.create("third", "three").expect("create");
        assert_eq!(created.post.map(|p| p.id), Some(103));
    }

    #[test]
    fn corrupt_collection_fails_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("posts.json"), "{not json").expect("write");
        let gateway = CountingGateway::default();
        let err = Session::open(&gateway, FileStore::new(dir.path()))
            .err()
            .expect("corrupt");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn unrestored_session_resets_corrupt_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("next_id"), "140").expect("write");
        std::fs::write(dir.path().join("posts.json"), "{not json").expect("write");
        let gateway = CountingGateway::default();

        let mut session = Session::unrestored(&gateway, FileStore::new(dir.path()));
        assert_eq!(session.fetch(3).expect("fetch").id, 3);
        assert_eq!(session.limits().next, 100);
        assert!(session.posts().is_empty());
        assert!(dir.path().join("posts.json").exists());

        session.reset();
        assert!(!dir.path().join("posts.json").exists());
        assert!(!dir.path().join("next_id").exists());

        let session = Session::open(&gateway, FileStore::new(dir.path())).expect("reopen");
        assert_eq!(session.limits().next, 100);
        assert_eq!(gateway.calls.get(), 1);
    }

    #[test]
    fn config_rejects_bad_base_url() {
        let err = SessionConfig::new()
            .with_base_url("ftp://example.com")
            .ephemeral(true)
            .open()
            .err()
            .expect("usage");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn ephemeral_config_starts_fresh() {
        let session = SessionConfig::new()
            .with_base_url("http://127.0.0.1:9")
            .ephemeral(true)
            .open()
            .expect("open");
        assert_eq!(session.limits().next, 100);
        assert!(session.posts().is_empty());
    }
}
