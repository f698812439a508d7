//! Backend-agnostic cache-aside facade.
//!
//! [`CacheBackend`] is the byte-level contract every store implements,
//! [`codec`] layers typed values on top of it, and [`remember()`] turns a
//! compute function into a compute-once-then-reuse one.

pub mod aside;
pub mod codec;
pub mod ports;
pub mod remember;

pub use aside::CacheAside;
pub use ports::CacheBackend;
pub use remember::remember;
pub use shared::{BoxError, Error, Result};
