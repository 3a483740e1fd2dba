/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use std::time::Duration;

use cache::RedisClient;
use log::{debug, error, warn};

use super::context::LockContext;
use super::error::{DistributedLockError, Result};
use super::store::LockStore;
use super::token::LockToken;

/// Default lock expiration time (milliseconds)
pub const DEFAULT_EXPIRE_MILLIS: u64 = 5000;
/// Retry count meaning "keep trying"
pub const RETRY_TIMES: u32 = u32::MAX;
/// Default pause between two attempts (milliseconds)
pub const DEFAULT_SLEEP_MILLIS: u64 = 500;

/// Sent on release when the task holds no token; tokens are never empty, so it never matches.
const ABSENT_TOKEN: &str = "";

/// Distributed lock over a shared [`LockStore`].
///
/// Acquisition writes a fresh token with `SET NX PX`, release deletes the
/// record only if it still holds that token. Ownership is tracked in the
/// caller's [`LockContext`]; the lock itself keeps no mutable state and can be
/// shared freely between threads.
///
/// A lock that outlives its ttl is lost: there is no extension, size the ttl
/// above the longest expected critical section.
#[derive(Debug)]
pub struct DistributedLock<S: LockStore = RedisClient> {
    store: S,
}

impl DistributedLock<RedisClient> {
    /// Create a lock backed by the process-wide Redis client
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(RedisClient::get_instance()?))
    }
}

impl<S: LockStore> DistributedLock<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Acquire `key` with all defaults: 5000ms expiry, unbounded retries, 500ms pause
    pub fn acquire_default(&self, ctx: &mut LockContext, key: &str) -> bool {
        self.acquire(ctx, key, DEFAULT_EXPIRE_MILLIS, RETRY_TIMES, DEFAULT_SLEEP_MILLIS)
    }

    pub fn acquire_with_retries(&self, ctx: &mut LockContext, key: &str, retry_times: u32) -> bool {
        self.acquire(ctx, key, DEFAULT_EXPIRE_MILLIS, retry_times, DEFAULT_SLEEP_MILLIS)
    }

    pub fn acquire_with_retries_and_sleep(
        &self,
        ctx: &mut LockContext,
        key: &str,
        retry_times: u32,
        sleep_millis: u64,
    ) -> bool {
        self.acquire(ctx, key, DEFAULT_EXPIRE_MILLIS, retry_times, sleep_millis)
    }

    pub fn acquire_with_expire(&self, ctx: &mut LockContext, key: &str, expire_millis: u64) -> bool {
        self.acquire(ctx, key, expire_millis, RETRY_TIMES, DEFAULT_SLEEP_MILLIS)
    }

    pub fn acquire_with_expire_and_retries(
        &self,
        ctx: &mut LockContext,
        key: &str,
        expire_millis: u64,
        retry_times: u32,
    ) -> bool {
        self.acquire(ctx, key, expire_millis, retry_times, DEFAULT_SLEEP_MILLIS)
    }

    /// Acquire the lock
    ///
    /// # Arguments
    ///
    /// * `ctx` - Execution context of the calling task, receives the winning token
    /// * `key` - Lock key name
    /// * `expire_millis` - Lock expiration time (milliseconds), must be greater than 0
    /// * `retry_times` - Attempts made after the first one fails
    /// * `sleep_millis` - Pause between two attempts (milliseconds)
    ///
    /// # Returns
    ///
    /// Returns `true` when the lock is held by this task. Returns `false` when
    /// every attempt failed or the backoff sleep was interrupted.
    pub fn acquire(
        &self,
        ctx: &mut LockContext,
        key: &str,
        expire_millis: u64,
        retry_times: u32,
        sleep_millis: u64,
    ) -> bool {
        match self.try_acquire(ctx, key, expire_millis, retry_times, sleep_millis) {
            Ok(()) => true,
            Err(DistributedLockError::Interrupted) => {
                debug!("lock {} interrupted while waiting, giving up", key);
                false
            }
            Err(e) => {
                debug!("lock {} not acquired: {}", key, e);
                false
            }
        }
    }

    /// Same as [`DistributedLock::acquire`], reporting why the lock was not obtained.
    ///
    /// # Errors
    ///
    /// * `DistributedLockError::InvalidArgument` - If `expire_millis` is 0.
    /// * `DistributedLockError::AcquireTimeout` - If all `retry_times + 1` attempts failed.
    /// * `DistributedLockError::Interrupted` - If the backoff sleep was interrupted.
    pub fn try_acquire(
        &self,
        ctx: &mut LockContext,
        key: &str,
        expire_millis: u64,
        retry_times: u32,
        sleep_millis: u64,
    ) -> Result<()> {
        if expire_millis == 0 {
            error!("refusing to lock {} with a zero expiry", key);
            return Err(DistributedLockError::InvalidArgument(
                "expire_millis must be greater than 0".to_string(),
            ));
        }

        let mut remaining = retry_times;
        loop {
            if let Some(token) = self.attempt(key, expire_millis) {
                ctx.bind(key, token);
                return Ok(());
            }
            if remaining == 0 {
                return Err(DistributedLockError::AcquireTimeout);
            }
            remaining -= 1;
            debug!("lock {} failed, retrying... {} retries left", key, remaining);
            ctx.sleep(Duration::from_millis(sleep_millis))?;
        }
    }

    /// One `SET NX PX` with a fresh token; a store failure counts as a lost attempt
    fn attempt(&self, key: &str, expire_millis: u64) -> Option<LockToken> {
        let token = LockToken::issue();
        match self.store.try_set(key, token.as_str(), expire_millis) {
            Ok(true) => Some(token),
            Ok(false) => None,
            Err(e) => {
                error!("set lock {} occurred an exception: {}", key, e);
                None
            }
        }
    }

    /// Release the lock
    ///
    /// Deletes the record only if it still holds the token this task bound
    /// for `key`. The binding is cleared whatever happens. Store failures are
    /// logged and reported as `false`, never raised.
    ///
    /// # Returns
    ///
    /// Returns `true` iff this call deleted the lock record.
    pub fn release(&self, ctx: &mut LockContext, key: &str) -> bool {
        let token = ctx.clear(key);
        if token.is_none() {
            warn!("release lock {} without a bound token", key);
        }
        let expected = token.as_ref().map_or(ABSENT_TOKEN, LockToken::as_str);
        match self.store.compare_and_delete(key, expected) {
            Ok(deleted) => {
                if deleted == 0 && token.is_some() {
                    warn!("lock {} expired or is owned by another holder, nothing released", key);
                }
                deleted >= 1
            }
            Err(e) => {
                error!("release lock {} occurred an exception: {}", key, e);
                false
            }
        }
    }
}
