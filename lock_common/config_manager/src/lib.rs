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

/// Configuration loading for the lock services.
///
/// Configuration is read once from a YAML file into a typed struct and kept
/// in a process-wide `OnceLock`.
///
/// # Example
///
/// ```no_run
/// use config_manager::types::context::CONFIG;
///
/// CONFIG.initialize("lock_config.yaml").expect("Failed to load config");
/// let config = CONFIG.get_instance().expect("Config not initialized");
/// println!("redis mode: {:?}", config.redis.mode);
/// ```
pub mod manager;
pub mod types;

pub use manager::{parse_config, ConfigSingleton, ValidateConfig};
pub use types::context::{LockDefaults, LockServerConfig, RedisConfig, RedisMode};
