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
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::Result;
use super::LockStore;

#[derive(Debug)]
struct Record {
    token: String,
    expires_at: Instant,
}

impl Record {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Single-process [`LockStore`] with TTL expiry, for tests and local runs.
///
/// Both primitives run under one mutex, which gives them the same atomicity
/// Redis gives `SET NX PX` and the compare-and-delete script.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token currently stored under `key`, ignoring expired records
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.records
            .lock()
            .get(key)
            .filter(|r| r.is_live(now))
            .map(|r| r.token.clone())
    }

    /// Expire `key` immediately, as if its ttl had elapsed
    pub fn expire(&self, key: &str) -> bool {
        self.records.lock().remove(key).is_some()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.records.lock().values().filter(|r| r.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LockStore for MemoryStore {
    fn try_set(&self, key: &str, token: &str, ttl_millis: u64) -> Result<bool> {
        let now = Instant::now();
        let mut records = self.records.lock();
        if records.get(key).map_or(false, |r| r.is_live(now)) {
            return Ok(false);
        }
        records.insert(
            key.to_string(),
            Record {
                token: token.to_string(),
                expires_at: now + Duration::from_millis(ttl_millis),
            },
        );
        Ok(true)
    }

    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<u64> {
        let now = Instant::now();
        let mut records = self.records.lock();
        let (live, owned) = match records.get(key) {
            Some(r) => (r.is_live(now), r.token == expected),
            None => return Ok(0),
        };
        if !live {
            records.remove(key);
            return Ok(0);
        }
        if owned {
            records.remove(key);
            return Ok(1);
        }
        Ok(0)
    }
}
