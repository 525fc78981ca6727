//! Purpose: Define the public Rust API boundary for localpost.
//! Exports: Session entry points, the HTTP gateway, and the core types they expose.
//! Role: Stable surface for the CLI and embedders.
//! Invariants: Callers mutate state only through `Session` (or the engine directly).

mod remote;
mod session;

pub use crate::core::cache::ResourceCache;
pub use crate::core::engine::{NullRenderer, Outcome, Renderer, Route, SessionState};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::gateway::NetworkGateway;
pub use crate::core::ids::IdAllocator;
pub use crate::core::post::{DEFAULT_BOUNDARY, Post};
pub use crate::core::store::{FileStore, MemoryStore, PersistentStore};
pub use remote::{DEFAULT_BASE_URL, HttpGateway};
pub use session::{BoxedSession, Limits, Session, SessionConfig};

pub fn default_state_dir() -> std::path::PathBuf {
    crate::state_paths::default_state_dir()
}
