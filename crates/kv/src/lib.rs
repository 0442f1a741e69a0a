//! Redis-backed `Queue` and `Cache` abstractions shared by the fetcher and
//! the scheduler. Both traits are narrow on purpose: callers depend on the
//! trait, not on `redis`, so a future backend swap touches only this crate.

pub mod cache;
pub mod queue;

pub use cache::{Cache, RedisCache};
pub use queue::{Queue, RedisQueue};
