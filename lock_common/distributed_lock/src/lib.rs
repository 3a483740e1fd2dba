//! Distributed lock module, providing a distributed lock implementation based on Redis
//!
//! ```no_run
//! use distributed_lock::{DistributedLock, LockContext};
//!
//! let lock = DistributedLock::from_env().expect("redis not configured");
//! let mut ctx = LockContext::new();
//! if lock.acquire(&mut ctx, "order_42", 5000, 3, 200) {
//!     // protected section
//!     lock.release(&mut ctx, "order_42");
//! }
//! ```

pub mod context;
pub mod error;
pub mod guard;
pub mod invoker;
pub mod lock;
pub mod store;
pub mod token;

pub use context::{Interrupter, LockContext};
pub use error::{DistributedLockError, Result};
pub use guard::LockGuard;
pub use invoker::{invoke_locked, LockAction, LockAttributes};
pub use lock::{DistributedLock, DEFAULT_EXPIRE_MILLIS, DEFAULT_SLEEP_MILLIS, RETRY_TIMES};
pub use store::{LockStore, MemoryStore};
pub use token::LockToken;
