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

mod commands;

use std::path::PathBuf;
use std::process::{Command, ExitCode};
use std::thread;
use std::time::Duration;

use cache::RedisClient;
use clap::Parser;
use config_manager::types::context::CONFIG;
use config_manager::LockDefaults;
use distributed_lock::{invoke_locked, DistributedLock, DistributedLockError, LockContext};
use log::{error, info};
use thiserror::Error;

use crate::commands::LockCommands;

/// Exit code used when the lock could not be obtained, EX_TEMPFAIL from sysexits
const EXIT_NOT_ACQUIRED: u8 = 75;

const AFTER_HELP: &str = "Exit status: 75 when the lock is not acquired. \
`run` otherwise exits with the command's own status, or 1 when that status \
does not fit in 0-255 or the command was killed by a signal; a command that \
itself exits with 75 cannot be told apart from a lock that was not acquired.";

#[derive(Parser)]
#[clap(author, version, about = "Run work under a Redis distributed lock", long_about = None, after_help = AFTER_HELP)]
struct Cli {
    /// Lock configuration file; without it REDIS_URL or REDIS_CLUSTER_NODES is used
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// log4rs logging configuration file; without it RUST_LOG drives console logging
    #[clap(long)]
    log_config: Option<PathBuf>,

    #[clap(subcommand)]
    command: LockCommands,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Lock(#[from] DistributedLockError),

    #[error("Failed to run command: {0}")]
    Command(#[from] std::io::Error),
}

fn init_logging(log_config: Option<&PathBuf>) -> Result<(), CliError> {
    match log_config {
        Some(path) => common_log::init_with_yaml(path).map_err(|e| CliError::Config(e.to_string())),
        None => {
            env_logger::init();
            Ok(())
        }
    }
}

fn build_lock(config: Option<&PathBuf>) -> Result<(DistributedLock<RedisClient>, LockDefaults), CliError> {
    match config {
        Some(path) => {
            CONFIG.initialize(path).map_err(CliError::Config)?;
            let config = CONFIG.get_instance().map_err(CliError::Config)?;
            let client = RedisClient::from_config(&config.redis).map_err(DistributedLockError::from)?;
            Ok((DistributedLock::new(client), config.lock.clone()))
        }
        None => Ok((DistributedLock::from_env()?, LockDefaults::default())),
    }
}

/// Maps a child status code onto a process exit code, 1 when it has none or it does not fit
fn child_exit_code(code: Option<i32>) -> u8 {
    code.and_then(|code| u8::try_from(code).ok()).unwrap_or(1)
}

/// Returns the process exit code
fn execute(cli: Cli) -> Result<u8, CliError> {
    let (lock, defaults) = build_lock(cli.config.as_ref())?;
    let mut ctx = LockContext::new();

    match cli.command {
        LockCommands::Run { lock: args, command } => {
            let attrs = args.to_attributes(&defaults);
            let status = invoke_locked(&lock, &mut ctx, &attrs, |_| {
                info!("running {:?} under lock {}", command, attrs.key());
                Command::new(&command[0]).args(&command[1..]).status()
            })?;
            match status {
                Some(status) => Ok(child_exit_code(status.code())),
                None => {
                    error!("{}", DistributedLockError::AcquireTimeout);
                    eprintln!("lock {} not acquired", attrs.key());
                    Ok(EXIT_NOT_ACQUIRED)
                }
            }
        }
        LockCommands::Hold { lock: args, hold_millis } => {
            let attrs = args.to_attributes(&defaults);
            let held = invoke_locked(&lock, &mut ctx, &attrs, |_| -> Result<(), CliError> {
                println!("holding lock {} for {}ms", attrs.key(), hold_millis);
                thread::sleep(Duration::from_millis(hold_millis));
                Ok(())
            })?;
            match held {
                Some(()) => {
                    println!("released lock {}", attrs.key());
                    Ok(0)
                }
                None => {
                    eprintln!("lock {} not acquired", attrs.key());
                    Ok(EXIT_NOT_ACQUIRED)
                }
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_config.as_ref()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    match execute(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
