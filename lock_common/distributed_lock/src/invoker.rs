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

use config_manager::LockDefaults;
use log::debug;

use super::context::LockContext;
use super::lock::DistributedLock;
use super::store::LockStore;

/// What to do when the first attempt finds the lock taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockAction {
    /// One attempt only
    GiveUp,
    /// Retry `retry_times` times, `sleep_millis` apart
    #[default]
    Continue,
}

/// Lock settings for one protected call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockAttributes {
    /// Resource name, first half of the lock key
    pub name: String,
    /// Resource value, second half of the lock key
    pub value: String,
    /// Lock expiration time (milliseconds)
    pub keep_millis: u64,
    pub action: LockAction,
    /// Pause between attempts (milliseconds), ignored with `GiveUp`
    pub sleep_millis: u64,
    pub retry_times: u32,
}

impl Default for LockAttributes {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            value: "default".to_string(),
            keep_millis: 5000,
            action: LockAction::Continue,
            sleep_millis: 200,
            retry_times: 5,
        }
    }
}

impl LockAttributes {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Attributes taking their timings from configuration
    pub fn from_defaults(name: impl Into<String>, value: impl Into<String>, defaults: &LockDefaults) -> Self {
        Self {
            keep_millis: defaults.keep_millis,
            sleep_millis: defaults.sleep_millis,
            retry_times: defaults.retry_times,
            ..Self::new(name, value)
        }
    }

    pub fn with_keep_millis(mut self, keep_millis: u64) -> Self {
        self.keep_millis = keep_millis;
        self
    }

    pub fn with_action(mut self, action: LockAction) -> Self {
        self.action = action;
        self
    }

    pub fn with_sleep_millis(mut self, sleep_millis: u64) -> Self {
        self.sleep_millis = sleep_millis;
        self
    }

    pub fn with_retry_times(mut self, retry_times: u32) -> Self {
        self.retry_times = retry_times;
        self
    }

    /// Lock key, `name` and `value` joined by `_`
    pub fn key(&self) -> String {
        format!("{}_{}", self.name, self.value)
    }

    pub fn effective_retry_times(&self) -> u32 {
        match self.action {
            LockAction::Continue => self.retry_times,
            LockAction::GiveUp => 0,
        }
    }
}

/// Run `work` while holding the lock described by `attrs`.
///
/// Returns `Ok(None)` without running `work` when the lock is not obtained.
/// Otherwise returns `work`'s own result, errors included; the lock is released
/// before this function returns on every path, panics included.
///
/// `work` receives the task's context so it can take further locks.
pub fn invoke_locked<S, T, E, F>(
    lock: &DistributedLock<S>,
    ctx: &mut LockContext,
    attrs: &LockAttributes,
    work: F,
) -> Result<Option<T>, E>
where
    S: LockStore,
    F: FnOnce(&mut LockContext) -> Result<T, E>,
{
    let key = attrs.key();
    let mut guard = match lock.lock_guard(
        ctx,
        &key,
        attrs.keep_millis,
        attrs.effective_retry_times(),
        attrs.sleep_millis,
    ) {
        Some(guard) => guard,
        None => {
            debug!("get lock failed : {}", key);
            return Ok(None);
        }
    };

    debug!("get lock success : {}", key);
    let result = work(guard.context());
    if result.is_err() {
        debug!("locked work on {} returned an error", key);
    }
    let released = guard.release();
    debug!("release lock : {}{}", key, if released { " success" } else { " failed" });
    result.map(Some)
}
