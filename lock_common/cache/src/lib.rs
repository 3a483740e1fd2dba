//! Redis access for the distributed lock: client construction for single-node and
//! cluster deployments plus the two atomic lock primitives.

pub mod client;
pub mod error;
pub mod operations;
pub mod scripts;

pub use client::RedisClient;
pub use error::RedisError;
