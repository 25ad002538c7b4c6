// crates/mcp-core/src/lib.rs
// ============================================================================
// Module: MCP Core
// Description: Request-processing support services shared by every transport.
// Purpose: Worker pool, rate limiter, content cache, URI router, registry.
// Dependencies: mcp-types, thiserror
// ============================================================================

//! ## Overview
//! These are the concurrency-bearing pieces the rest of the server builds on:
//! a bounded worker pool, a sliding-window rate limiter, a single-flight TTL
//! cache, a URI-template router, and the insertion-ordered resource/tool
//! registry. Everything here runs on plain OS threads with mutexes and
//! condition variables — no async runtime is required at this layer.

pub mod cache;
pub mod pool;
pub mod ratelimit;
pub mod registry;
pub mod router;

pub use cache::CacheConfig;
pub use cache::CacheError;
pub use cache::ContentCache;
pub use pool::PoolError;
pub use pool::WorkerPool;
pub use pool::WorkerPoolConfig;
pub use ratelimit::RateLimitConfig;
pub use ratelimit::RateLimitDecision;
pub use ratelimit::RateLimiter;
pub use registry::Registry;
pub use registry::RegistryError;
pub use router::RouteMatch;
pub use router::UriTemplateRouter;
