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

mod memory;

use std::sync::Arc;
use std::time::Duration;

use cache::RedisClient;

use super::error::Result;

pub use memory::MemoryStore;

/// The two atomic primitives the lock algorithm needs from a shared store.
pub trait LockStore: Send + Sync {
    /// Create `key` holding `token` with a `ttl_millis` expiry, only if `key` does not exist.
    ///
    /// Returns `Ok(true)` iff the record was created.
    fn try_set(&self, key: &str, token: &str, ttl_millis: u64) -> Result<bool>;

    /// Delete `key` only if it currently holds `expected`.
    ///
    /// Returns the number of deleted records, 1 or 0.
    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<u64>;
}

impl LockStore for RedisClient {
    fn try_set(&self, key: &str, token: &str, ttl_millis: u64) -> Result<bool> {
        Ok(self.set_nx_px(key, token, Duration::from_millis(ttl_millis))?)
    }

    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<u64> {
        let deleted = RedisClient::compare_and_delete(self, key, expected)?;
        Ok(deleted.max(0) as u64)
    }
}

impl<S: LockStore + ?Sized> LockStore for Arc<S> {
    fn try_set(&self, key: &str, token: &str, ttl_millis: u64) -> Result<bool> {
        (**self).try_set(key, token, ttl_millis)
    }

    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<u64> {
        (**self).compare_and_delete(key, expected)
    }
}
