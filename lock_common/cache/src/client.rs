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

use std::fmt;
use std::sync::{Arc, Mutex};

use config_manager::{RedisConfig, RedisMode};
use lazy_static::lazy_static;
use log::info;
use redis::cluster::ClusterClient;
use redis::{Client, ConnectionLike};

use crate::error::RedisError;

lazy_static! {
    static ref REDIS_CLIENT: Arc<Mutex<Option<RedisClient>>> = Arc::new(Mutex::new(None));
}

/// Environment variable holding the single-node connection url
pub const REDIS_URL_ENV: &str = "REDIS_URL";
/// Environment variable holding comma separated cluster seed node urls
pub const REDIS_CLUSTER_NODES_ENV: &str = "REDIS_CLUSTER_NODES";

/// Deployment the client talks to, fixed when the client is built
#[derive(Clone)]
pub(crate) enum Topology {
    Standalone(Client),
    Cluster(ClusterClient),
}

/// Open connection kept between calls; clones of a client share it
pub(crate) type SharedConnection = Arc<Mutex<Option<Box<dyn ConnectionLike + Send>>>>;

#[derive(Clone)]
pub struct RedisClient {
    pub(crate) topology: Topology,
    pub(crate) connection: SharedConnection,
}

impl fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisClient").field("mode", &self.mode()).finish()
    }
}

impl RedisClient {
    /// Builds a client for a single Redis node. No connection is opened yet.
    pub fn standalone(url: &str) -> Result<RedisClient, RedisError> {
        let client = Client::open(url).map_err(RedisError::ConnectionError)?;
        Ok(RedisClient::with_topology(Topology::Standalone(client)))
    }

    /// Builds a client for a Redis cluster from its seed nodes. No connection is opened yet.
    pub fn cluster<S: AsRef<str>>(nodes: &[S]) -> Result<RedisClient, RedisError> {
        if nodes.is_empty() {
            return Err(RedisError::OperationError("Cluster node list is empty".to_string()));
        }
        let nodes: Vec<&str> = nodes.iter().map(|n| n.as_ref()).collect();
        let client = ClusterClient::new(nodes).map_err(RedisError::ConnectionError)?;
        Ok(RedisClient::with_topology(Topology::Cluster(client)))
    }

    fn with_topology(topology: Topology) -> RedisClient {
        RedisClient {
            topology,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_config(config: &RedisConfig) -> Result<RedisClient, RedisError> {
        match config.mode {
            RedisMode::Standalone => Self::standalone(config.url.trim()),
            RedisMode::Cluster => Self::cluster(&config.nodes),
        }
    }

    pub fn mode(&self) -> RedisMode {
        match self.topology {
            Topology::Standalone(_) => RedisMode::Standalone,
            Topology::Cluster(_) => RedisMode::Cluster,
        }
    }

    /// Get the process-wide RedisClient, creating it on first use.
    ///
    /// Cluster mode is selected when `REDIS_CLUSTER_NODES` is set, otherwise
    /// `REDIS_URL` is used for a single node.
    pub fn get_instance() -> Result<RedisClient, RedisError> {
        let mut global_client = REDIS_CLIENT
            .lock()
            .map_err(|_| RedisError::OperationError("Failed to acquire lock".to_string()))?;

        if global_client.is_none() {
            let redis_client = Self::from_env()?;
            info!("Redis client initialized in {:?} mode", redis_client.mode());
            *global_client = Some(redis_client);
        }

        global_client
            .as_ref()
            .cloned()
            .ok_or_else(|| RedisError::OperationError("Redis client initialization failed".to_string()))
    }

    fn from_env() -> Result<RedisClient, RedisError> {
        if let Ok(nodes) = std::env::var(REDIS_CLUSTER_NODES_ENV) {
            let nodes: Vec<&str> = nodes.split(',').map(str::trim).filter(|n| !n.is_empty()).collect();
            return Self::cluster(&nodes);
        }
        let redis_url = std::env::var(REDIS_URL_ENV).map_err(|_| {
            RedisError::OperationError(format!(
                "Neither {} nor {} environment variable is set",
                REDIS_URL_ENV, REDIS_CLUSTER_NODES_ENV
            ))
        })?;
        Self::standalone(&redis_url)
    }
}
