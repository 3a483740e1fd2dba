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

use log::debug;

use super::context::LockContext;
use super::lock::DistributedLock;
use super::store::LockStore;
use super::token::LockToken;

/// A held lock that is released when the guard goes out of scope,
/// including on early return and panic unwinding.
pub struct LockGuard<'a, S: LockStore> {
    lock: &'a DistributedLock<S>,
    ctx: &'a mut LockContext,
    key: String,
    released: bool,
}

impl<S: LockStore> DistributedLock<S> {
    /// Acquire `key` and tie its release to the returned guard.
    ///
    /// Returns `None` when the lock could not be obtained.
    pub fn lock_guard<'a>(
        &'a self,
        ctx: &'a mut LockContext,
        key: &str,
        expire_millis: u64,
        retry_times: u32,
        sleep_millis: u64,
    ) -> Option<LockGuard<'a, S>> {
        if !self.acquire(ctx, key, expire_millis, retry_times, sleep_millis) {
            return None;
        }
        Some(LockGuard {
            lock: self,
            ctx,
            key: key.to_string(),
            released: false,
        })
    }
}

impl<'a, S: LockStore> LockGuard<'a, S> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> Option<&LockToken> {
        self.ctx.current(&self.key)
    }

    /// The owning task's context, for taking further locks while this one is held
    pub fn context(&mut self) -> &mut LockContext {
        &mut *self.ctx
    }

    /// Release now and report whether the record was still ours
    pub fn release(mut self) -> bool {
        self.released = true;
        self.lock.release(self.ctx, &self.key)
    }
}

impl<'a, S: LockStore> Drop for LockGuard<'a, S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let released = self.lock.release(self.ctx, &self.key);
        debug!("release lock : {}{}", self.key, if released { " success" } else { " failed" });
    }
}
