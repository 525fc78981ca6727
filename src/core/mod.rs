// Core modules: records, identity, cache, persistence, routing, and error modeling.
pub mod cache;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod ids;
pub mod post;
pub mod store;
