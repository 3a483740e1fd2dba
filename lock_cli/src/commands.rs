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

use clap::{Args, Subcommand};
use config_manager::LockDefaults;
use distributed_lock::{LockAction, LockAttributes};

/// Lock settings shared by every command
#[derive(Args, Debug, Clone)]
pub struct LockArgs {
    /// Resource name
    #[clap(short, long, required = true)]
    pub name: String,

    /// Resource value, joined to the name with '_' to form the lock key
    #[clap(short, long, default_value = "default")]
    pub value: String,

    /// Lock expiration time in milliseconds, default from configuration
    #[clap(long)]
    pub keep_millis: Option<u64>,

    /// Retries after the first failed attempt, default from configuration
    #[clap(long)]
    pub retry_times: Option<u32>,

    /// Pause between attempts in milliseconds, default from configuration
    #[clap(long)]
    pub sleep_millis: Option<u64>,

    /// Make a single attempt and give up if the lock is taken
    #[clap(long)]
    pub give_up: bool,
}

impl LockArgs {
    pub fn to_attributes(&self, defaults: &LockDefaults) -> LockAttributes {
        let mut attrs = LockAttributes::from_defaults(&self.name, &self.value, defaults);
        if let Some(keep_millis) = self.keep_millis {
            attrs = attrs.with_keep_millis(keep_millis);
        }
        if let Some(retry_times) = self.retry_times {
            attrs = attrs.with_retry_times(retry_times);
        }
        if let Some(sleep_millis) = self.sleep_millis {
            attrs = attrs.with_sleep_millis(sleep_millis);
        }
        if self.give_up {
            attrs = attrs.with_action(LockAction::GiveUp);
        }
        attrs
    }
}

#[derive(Subcommand, Debug)]
pub enum LockCommands {
    /// Run a command while holding the lock
    Run {
        #[clap(flatten)]
        lock: LockArgs,

        /// Command and arguments, after '--'
        #[clap(required = true, last = true)]
        command: Vec<String>,
    },

    /// Hold the lock for a while, then release it
    Hold {
        #[clap(flatten)]
        lock: LockArgs,

        /// How long to hold the lock in milliseconds
        #[clap(long, default_value_t = 5000)]
        hold_millis: u64,
    },
}
