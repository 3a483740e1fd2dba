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

use serde::Deserialize;
use crate::{ConfigSingleton, ValidateConfig};

/// Main configuration structure that matches the lock_config.yaml file structure.
#[derive(Debug, Deserialize, Clone)]
pub struct LockServerConfig {
    /// Redis connection settings
    pub redis: RedisConfig,
    /// Defaults applied to lock calls that do not override them
    #[serde(default)]
    pub lock: LockDefaults,
}

/// Redis deployment shape
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    #[default]
    Standalone,
    Cluster,
}

/// Redis connection settings
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// Single-node or cluster
    #[serde(default)]
    pub mode: RedisMode,
    /// Connection url used in standalone mode, e.g. redis://127.0.0.1:6379
    #[serde(default)]
    pub url: String,
    /// Seed node urls used in cluster mode
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Lock defaults
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LockDefaults {
    /// Lock expiration time in milliseconds
    #[serde(default = "default_keep_millis")]
    pub keep_millis: u64,
    /// Number of retries after the first failed attempt
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,
    /// Pause between two attempts in milliseconds
    #[serde(default = "default_sleep_millis")]
    pub sleep_millis: u64,
}

fn default_keep_millis() -> u64 {
    5000
}

fn default_retry_times() -> u32 {
    5
}

fn default_sleep_millis() -> u64 {
    200
}

impl Default for LockDefaults {
    fn default() -> Self {
        Self {
            keep_millis: default_keep_millis(),
            retry_times: default_retry_times(),
            sleep_millis: default_sleep_millis(),
        }
    }
}

impl ValidateConfig for LockServerConfig {
    fn validate(&self) -> Result<(), String> {
        match self.redis.mode {
            RedisMode::Standalone if self.redis.url.trim().is_empty() => {
                return Err("redis.url must be set in standalone mode".to_string());
            }
            RedisMode::Cluster if self.redis.nodes.is_empty() => {
                return Err("redis.nodes must list at least one node in cluster mode".to_string());
            }
            _ => {}
        }
        if self.lock.keep_millis == 0 {
            return Err("lock.keep_millis must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Global configuration singleton instance
///
/// Call `CONFIG.initialize(path)` once at startup and `CONFIG.get_instance()` afterwards.
pub static CONFIG: ConfigSingleton<LockServerConfig> = ConfigSingleton::new();

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_config;

    #[test]
    fn test_parse_standalone_with_defaults() {
        let yaml = r#"
redis:
  url: redis://127.0.0.1:6379
"#;
        let config: LockServerConfig = parse_config(yaml).unwrap();
        assert_eq!(config.redis.mode, RedisMode::Standalone);
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
        assert_eq!(config.lock, LockDefaults::default());
    }

    #[test]
    fn test_parse_cluster() {
        let yaml = r#"
redis:
  mode: cluster
  nodes:
    - redis://10.0.0.1:7000
    - redis://10.0.0.2:7000
lock:
  keep_millis: 1000
  retry_times: 3
  sleep_millis: 50
"#;
        let config: LockServerConfig = parse_config(yaml).unwrap();
        assert_eq!(config.redis.mode, RedisMode::Cluster);
        assert_eq!(config.redis.nodes.len(), 2);
        assert_eq!(config.lock.keep_millis, 1000);
        assert_eq!(config.lock.retry_times, 3);
        assert_eq!(config.lock.sleep_millis, 50);
    }

    #[test]
    fn test_cluster_without_nodes_is_rejected() {
        let yaml = "redis:\n  mode: cluster\n";
        let err = parse_config::<LockServerConfig>(yaml).unwrap_err();
        assert!(err.contains("redis.nodes"));
    }

    #[test]
    fn test_zero_keep_millis_is_rejected() {
        let yaml = "redis:\n  url: redis://localhost\nlock:\n  keep_millis: 0\n";
        let err = parse_config::<LockServerConfig>(yaml).unwrap_err();
        assert!(err.contains("keep_millis"));
    }
}
