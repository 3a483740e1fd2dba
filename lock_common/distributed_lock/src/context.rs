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

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use parking_lot::{Condvar, Mutex};

use super::error::{DistributedLockError, Result};
use super::token::LockToken;

/// Execution context of one logical task.
///
/// Holds the tokens of the locks the task currently owns, keyed by lock key,
/// and the task's interrupt flag. Every mutation goes through `&mut self`, so a
/// context can only ever serve one task at a time.
#[derive(Debug, Default)]
pub struct LockContext {
    tokens: HashMap<String, LockToken>,
    interrupter: Interrupter,
}

impl LockContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `token` as the proof of ownership for `key`
    pub fn bind(&mut self, key: &str, token: LockToken) {
        self.tokens.insert(key.to_string(), token);
    }

    /// Token bound to `key`, if this task holds it
    pub fn current(&self, key: &str) -> Option<&LockToken> {
        self.tokens.get(key)
    }

    /// Forget the token bound to `key`
    pub fn clear(&mut self, key: &str) -> Option<LockToken> {
        self.tokens.remove(key)
    }

    /// Keys this task still has a token for
    pub fn held_keys(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    /// Handle other threads can use to cancel this task's backoff sleep
    pub fn interrupter(&self) -> Interrupter {
        self.interrupter.clone()
    }

    pub(crate) fn sleep(&self, duration: Duration) -> Result<()> {
        self.interrupter.sleep(duration)
    }
}

impl Drop for LockContext {
    fn drop(&mut self) {
        if !self.tokens.is_empty() {
            let keys: Vec<&str> = self.held_keys().collect();
            warn!("Lock context dropped while still bound to {:?}, locks will expire by ttl", keys);
        }
    }
}

#[derive(Debug, Default)]
struct InterruptState {
    interrupted: Mutex<bool>,
    wakeup: Condvar,
}

/// Cancels the backoff sleep of the task owning a [`LockContext`].
///
/// An interrupt stays pending until a sleep observes it; observing it clears it.
#[derive(Debug, Clone, Default)]
pub struct Interrupter {
    state: Arc<InterruptState>,
}

impl Interrupter {
    pub fn interrupt(&self) {
        let mut interrupted = self.state.interrupted.lock();
        *interrupted = true;
        self.state.wakeup.notify_all();
    }

    pub fn is_interrupted(&self) -> bool {
        *self.state.interrupted.lock()
    }

    fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        let mut interrupted = self.state.interrupted.lock();
        loop {
            if *interrupted {
                *interrupted = false;
                return Err(DistributedLockError::Interrupted);
            }
            if Instant::now() >= deadline {
                return Ok(());
            }
            self.state.wakeup.wait_until(&mut interrupted, deadline);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_bind_current_clear() {
        let mut ctx = LockContext::new();
        let token = LockToken::issue();
        ctx.bind("order_1", token.clone());
        assert_eq!(ctx.current("order_1"), Some(&token));
        assert_eq!(ctx.current("order_2"), None);
        assert_eq!(ctx.held_keys().collect::<Vec<_>>(), vec!["order_1"]);
        assert_eq!(ctx.clear("order_1"), Some(token));
        assert_eq!(ctx.current("order_1"), None);
        assert_eq!(ctx.held_keys().count(), 0);
    }

    #[test]
    fn test_bind_replaces_previous_token() {
        let mut ctx = LockContext::new();
        let first = LockToken::issue();
        let second = LockToken::issue();
        ctx.bind("k", first);
        ctx.bind("k", second.clone());
        assert_eq!(ctx.current("k"), Some(&second));
        ctx.clear("k");
    }

    #[test]
    fn test_sleep_runs_to_completion() {
        let ctx = LockContext::new();
        let start = Instant::now();
        ctx.sleep(Duration::from_millis(30)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_pending_interrupt_aborts_and_is_consumed() {
        let ctx = LockContext::new();
        ctx.interrupter().interrupt();
        assert!(ctx.interrupter().is_interrupted());
        assert!(matches!(ctx.sleep(Duration::from_secs(10)), Err(DistributedLockError::Interrupted)));
        assert!(!ctx.interrupter().is_interrupted());
        ctx.sleep(Duration::from_millis(1)).unwrap();
    }

    #[test]
    fn test_interrupt_from_another_thread_wakes_sleeper() {
        let ctx = LockContext::new();
        let interrupter = ctx.interrupter();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            interrupter.interrupt();
        });
        let start = Instant::now();
        let result = ctx.sleep(Duration::from_secs(10));
        handle.join().unwrap();
        assert!(matches!(result, Err(DistributedLockError::Interrupted)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
