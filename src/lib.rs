//! Purpose: Library crate behind the `localpost` CLI.
//! Exports: `core` (posts, id allocation, cache, store, engine, errors) and `api`.
//! Role: Reconciles a post collection between a remote REST service and a local cache.
//! Invariants: Ids above the boundary are local-only and never sent to the service.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
mod state_paths;
