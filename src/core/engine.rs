//! Purpose: Route post operations between the remote service and the local cache.
//! Exports: `ReconciliationEngine`, `SessionState`, `Outcome`, `Route`, `Renderer`.
//! Role: Sole mutator of allocator + cache state; issues every persistence write.
//! Invariants: `id > boundary` alone decides routing for update/delete.
//! Invariants: Local-range ids never reach the gateway; remote-range ids always do.
//! Invariants: A failed operation leaves allocator and cache untouched.
//! Invariants: Persistence is best-effort; write failures are logged, not returned.
use tracing::{debug, info, warn};

use crate::core::cache::ResourceCache;
use crate::core::error::{Error, ErrorKind};
use crate::core::gateway::NetworkGateway;
use crate::core::ids::IdAllocator;
use crate::core::post::{DEFAULT_BOUNDARY, Draft, Post};
use crate::core::store::PersistentStore;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Route {
    Local,
    Remote,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Route::Local => "local",
            Route::Remote => "remote",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub route: Route,
    /// Created/updated post, or the cached copy removed by a delete.
    pub post: Option<Post>,
}

/// Receives the full cache contents whenever an operation changes them.
pub trait Renderer {
    fn render(&mut self, posts: &[Post]);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _posts: &[Post]) {}
}

/// Caller-owned allocator + cache. Only one operation may use it at a time,
/// which `&mut` borrows enforce.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionState {
    ids: IdAllocator,
    cache: ResourceCache,
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_boundary(DEFAULT_BOUNDARY)
    }

    pub fn with_boundary(boundary: u64) -> Self {
        Self {
            ids: IdAllocator::with_boundary(boundary),
            cache: ResourceCache::new(),
        }
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn route(&self, id: u64) -> Route {
        if self.ids.is_local_range(id) {
            Route::Local
        } else {
            Route::Remote
        }
    }

    fn ensure_valid_range(&self, id: u64) -> Result<(), Error> {
        if self.ids.is_valid_range(id) {
            return Ok(());
        }
        let next = self.ids.next();
        Err(Error::new(ErrorKind::Range)
            .with_message(format!("id must be between 1 and {next}"))
            .with_hint(format!("Use an id in 1–{next}."))
            .with_id(id))
    }
}

pub struct ReconciliationEngine<G, S> {
    gateway: G,
    store: S,
    renderer: Box<dyn Renderer>,
}

impl<G, S> ReconciliationEngine<G, S>
where
    G: NetworkGateway,
    S: PersistentStore,
{
    pub fn new(gateway: G, store: S) -> Self {
        Self {
            gateway,
            store,
            renderer: Box::new(NullRenderer),
        }
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuild session state from the store. A counter that lags behind the
    /// highest cached id is raised (and rewritten) so allocation cannot collide.
    pub fn load(&mut self, boundary: u64) -> Result<SessionState, Error> {
        let mut state = SessionState::with_boundary(boundary);
        state.ids.restore(self.store.counter()?);
        if let Some(posts) = self.store.collection()? {
            state.cache.restore(posts);
        }
        if let Some(max_id) = state.cache.max_id() {
            if state.ids.observe(max_id) {
                warn!(next = max_id, "id counter behind cached posts; raising it");
                self.persist_counter(&state);
            }
        }
        debug!(
            next = state.ids.next(),
            cached = state.cache.len(),
            "restored session state"
        );
        Ok(state)
    }

    pub fn create(
        &mut self,
        state: &mut SessionState,
        title: &str,
        body: &str,
    ) -> Result<Outcome, Error> {
        let draft = Draft::parse(title, body)?;
        state.ids.peek()?;
        let mut post = self.gateway.create(&draft.title, &draft.body)?;

        let id = state.ids.allocate()?;
        debug!(remote_id = post.id, local_id = id, "replacing service-assigned id");
        post.id = id;
        if let Err(err) = state.cache.insert_front(post.clone()) {
            state.ids.restore(Some(id - 1));
            return Err(err);
        }

        self.persist_counter(state);
        self.persist_collection(state);
        self.render(state);
        info!(id, "created post");
        Ok(Outcome {
            route: Route::Remote,
            post: Some(post),
        })
    }

    pub fn update(
        &mut self,
        state: &mut SessionState,
        id: u64,
        title: &str,
        body: &str,
    ) -> Result<Outcome, Error> {
        let draft = Draft::parse(title, body)?;
        state.ensure_valid_range(id)?;

        let route = state.route(id);
        let post = match route {
            Route::Local => state
                .cache
                .update_fields(id, &draft.title, &draft.body)
                .cloned()
                .ok_or_else(|| {
                    Error::new(ErrorKind::NotFound)
                        .with_message(format!("no local post found with id {id}"))
                        .with_id(id)
                })?,
            Route::Remote => {
                let post = self.gateway.update(id, &draft.title, &draft.body)?;
                if post.id != id {
                    return Err(Error::new(ErrorKind::Remote)
                        .with_message(format!("service returned post {} for id {id}", post.id))
                        .with_id(id));
                }
                state.cache.replace(id, post.clone());
                post
            }
        };

        self.persist_collection(state);
        self.render(state);
        info!(id, route = route.as_str(), "updated post");
        Ok(Outcome {
            route,
            post: Some(post),
        })
    }

    pub fn delete(&mut self, state: &mut SessionState, id: u64) -> Result<Outcome, Error> {
        state.ensure_valid_range(id)?;

        let route = state.route(id);
        if route == Route::Remote {
            self.gateway.delete(id)?;
        }
        let removed = state.cache.find_by_id(id).cloned();
        state.cache.remove_by_id(id);

        self.persist_collection(state);
        if removed.is_some() {
            self.render(state);
        }
        info!(
            id,
            route = route.as_str(),
            cached = removed.is_some(),
            "deleted post"
        );
        Ok(Outcome {
            route,
            post: removed,
        })
    }

    /// Read straight from the service; cache and allocator are not consulted.
    pub fn fetch(&self, id: u64) -> Result<Post, Error> {
        self.gateway.read(id)
    }

    pub fn reset(&mut self, state: &mut SessionState) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear persisted state");
        }
        state.ids.reset();
        state.cache.clear();
        self.render(state);
        info!(next = state.ids.next(), "reset session state");
    }

    fn persist_counter(&mut self, state: &SessionState) {
        if let Err(err) = self.store.set_counter(state.ids.next()) {
            warn!(error = %err, "failed to persist id counter");
        }
    }

    fn persist_collection(&mut self, state: &SessionState) {
        if let Err(err) = self.store.set_collection(state.cache.snapshot()) {
            warn!(error = %err, "failed to persist post collection");
        }
    }

    fn render(&mut self, state: &SessionState) {
        self.renderer.render(state.cache.snapshot());
    }
}
