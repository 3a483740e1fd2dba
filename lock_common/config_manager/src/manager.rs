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
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::OnceLock;

/// Sanity checks run on a freshly parsed configuration before it is published.
pub trait ValidateConfig {
    /// Returns a description of the first invalid setting, if any.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A thread-safe singleton configuration holder.
///
/// The configuration is parsed from YAML once per process; later calls to
/// `initialize` are no-ops.
///
/// # Type Parameters
///
/// * `T` - The configuration type, deserialized with `serde_yaml` and validated through [`ValidateConfig`].
pub struct ConfigSingleton<T: for<'a> Deserialize<'a> + ValidateConfig + Send + Sync + 'static> {
    instance: OnceLock<T>,
}

impl<T: for<'a> Deserialize<'a> + ValidateConfig + Send + Sync + 'static> ConfigSingleton<T> {
    /// Creates a new, uninitialized `ConfigSingleton` instance.
    pub const fn new() -> Self {
        ConfigSingleton {
            instance: OnceLock::new(),
        }
    }

    /// Loads, parses and validates the YAML file at `path`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if initialization was successful or if the singleton was already initialized.
    /// * `Err(String)` if the file cannot be read, parsed or fails validation.
    pub fn initialize<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        if self.instance.get().is_some() {
            return Ok(());
        }

        let file = File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?;

        let mut contents = String::new();
        let mut reader = BufReader::new(file);
        reader
            .read_to_string(&mut contents)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        self.initialize_from_str(&contents)
    }

    /// Same as [`ConfigSingleton::initialize`] but reads the YAML from a string.
    pub fn initialize_from_str(&self, contents: &str) -> Result<(), String> {
        if self.instance.get().is_some() {
            return Ok(());
        }
        let config = parse_config::<T>(contents)?;
        let _ = self.instance.set(config);
        Ok(())
    }

    /// Retrieves a reference to the initialized configuration instance.
    ///
    /// # Errors
    ///
    /// Returns an error if `initialize` has not been called successfully before calling this method.
    pub fn get_instance(&self) -> Result<&T, String> {
        self.instance.get().ok_or_else(|| "Configuration not initialized".to_string())
    }
}

/// Parses and validates a configuration without touching any singleton.
pub fn parse_config<T: for<'a> Deserialize<'a> + ValidateConfig>(contents: &str) -> Result<T, String> {
    let config: T = serde_yaml::from_str(contents).map_err(|e| format!("Failed to parse YAML: {}", e))?;
    config.validate().map_err(|e| format!("Invalid configuration: {}", e))?;
    Ok(config)
}
