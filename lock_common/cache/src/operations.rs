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

use log::warn;
use redis::ConnectionLike;

use crate::client::{RedisClient, Topology};
use crate::error::RedisError;
use crate::scripts::COMPARE_AND_DELETE;

impl RedisClient {
    fn connect(&self) -> Result<Box<dyn ConnectionLike + Send>, RedisError> {
        let conn: Box<dyn ConnectionLike + Send> = match &self.topology {
            Topology::Standalone(client) => Box::new(client.get_connection().map_err(RedisError::ConnectionError)?),
            Topology::Cluster(client) => Box::new(client.get_connection().map_err(RedisError::ConnectionError)?),
        };
        Ok(conn)
    }

    /// Runs `op` on the shared connection, opening it first if needed.
    ///
    /// A cluster connection carries the slot map, so reusing it avoids
    /// rediscovering the topology on every attempt. A failed call discards the
    /// connection and the next call reconnects.
    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut dyn ConnectionLike) -> redis::RedisResult<T>,
    ) -> Result<T, RedisError> {
        let mut slot = self
            .connection
            .lock()
            .map_err(|_| RedisError::OperationError("Failed to acquire connection lock".to_string()))?;
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };
        match op(&mut *conn) {
            Ok(value) => {
                *slot = Some(conn);
                Ok(value)
            }
            Err(e) => {
                warn!("Dropping Redis connection after error: {}", e);
                Err(RedisError::ConnectionError(e))
            }
        }
    }

    /// Sets a key only if it does not exist, with a millisecond expiry, in one round trip.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to set.
    /// * `value` - The value to store.
    /// * `ttl` - Expiration of the key, sent with millisecond precision.
    ///
    /// # Returns
    ///
    /// Returns `Ok(true)` when the key was created, `Ok(false)` when it already existed.
    ///
    /// # Errors
    ///
    /// * `RedisError::OperationError` - If `ttl` is shorter than one millisecond.
    /// * `RedisError::ConnectionError` - If Redis cannot be reached or rejects the command.
    pub fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, RedisError> {
        let millis = ttl.as_millis();
        if millis == 0 {
            return Err(RedisError::OperationError("Expiry must be at least 1ms".to_string()));
        }
        let millis = u64::try_from(millis).unwrap_or(u64::MAX);
        let reply: Option<String> = self.with_connection(|conn| {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("PX")
                .arg(millis)
                .query(conn)
        })?;
        Ok(reply.is_some())
    }

    /// Deletes a key only if its value equals `expected`, atomically on the server.
    ///
    /// A single node runs the script through `EVALSHA`, loading it on a cache miss.
    /// A cluster gets a plain `EVAL` so that the script is routed by `key` to the
    /// node owning its slot.
    ///
    /// # Returns
    ///
    /// Returns the number of deleted keys: 1 on a match, 0 otherwise.
    ///
    /// # Errors
    ///
    /// * `RedisError::ConnectionError` - If Redis cannot be reached or the script fails.
    pub fn compare_and_delete(&self, key: &str, expected: &str) -> Result<i64, RedisError> {
        let clustered = matches!(self.topology, Topology::Cluster(_));
        self.with_connection(|conn| {
            if clustered {
                redis::cmd("EVAL")
                    .arg(COMPARE_AND_DELETE)
                    .arg(1)
                    .arg(key)
                    .arg(expected)
                    .query(conn)
            } else {
                redis::Script::new(COMPARE_AND_DELETE).key(key).arg(expected).invoke(conn)
            }
        })
    }
}
