//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

//! JSON run configuration shared by both binaries
//!
//! Field names follow the configuration files already in use, with
//! `max_communicate_num` and `random_seed` accepted as aliases.

use std::fs;
use std::path::Path;

use protocol::fileio::{ActivePaths, PassivePaths};
use protocol::vlr::TrainingParams;
use serde::Deserialize;

use crate::connect::channel::{DEFAULT_MAX_FRAME_LENGTH, DEFAULT_READ_BUFFER_SIZE};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read settings from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0} is not configured")]
    Missing(&'static str),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

fn default_party_count() -> usize {
    1
}

fn default_read_buffer_size() -> usize {
    DEFAULT_READ_BUFFER_SIZE
}

fn default_max_frame_length() -> usize {
    DEFAULT_MAX_FRAME_LENGTH
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Listener of the active party
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Where passive parties find the active party
    pub ac_host: Option<String>,
    pub ac_port: Option<u16>,
    #[serde(alias = "max_communicate_num", default = "default_party_count")]
    pub party_count: usize,
    #[serde(alias = "random_seed", default)]
    pub seed: Option<u64>,
    pub epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    #[serde(default)]
    pub train_data_filename: Option<String>,
    #[serde(default)]
    pub train_label_filename: Option<String>,
    #[serde(default)]
    pub val_data_filename: Option<String>,
    #[serde(default)]
    pub val_label_filename: Option<String>,
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    #[serde(default = "default_max_frame_length")]
    pub max_frame_length: usize,
    #[serde(default)]
    pub metrics_path: Option<String>,
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Settings, ConfigError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Settings, ConfigError> {
        let text = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        let settings = Settings::from_json(&text)?;
        info!("Settings loaded from {}", path.as_ref().display());
        debug!("{:?}", settings);
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name, reason: &str| ConfigError::Invalid {
            name,
            reason: reason.to_string(),
        };
        if self.party_count == 0 {
            return Err(invalid("party_count", "at least one passive party"));
        }
        if self.epochs == 0 {
            return Err(invalid("epochs", "must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be at least 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid("learning_rate", "must be finite and positive"));
        }
        if self.read_buffer_size == 0 {
            return Err(invalid("read_buffer_size", "must be at least 1"));
        }
        Ok(())
    }

    fn address(
        host: &Option<String>,
        port: Option<u16>,
        host_name: &'static str,
        port_name: &'static str,
    ) -> Result<String, ConfigError> {
        let host = host.as_ref().ok_or(ConfigError::Missing(host_name))?;
        let port = port.ok_or(ConfigError::Missing(port_name))?;
        Ok(format!("{}:{}", host, port))
    }

    /// Address the active party listens on
    pub fn listen_addr(&self) -> Result<String, ConfigError> {
        Settings::address(&self.host, self.port, "host", "port")
    }

    /// Address a passive party connects to
    pub fn active_addr(&self) -> Result<String, ConfigError> {
        Settings::address(&self.ac_host, self.ac_port, "ac_host", "ac_port")
    }

    pub fn training_params(&self) -> TrainingParams {
        TrainingParams {
            epochs: self.epochs,
            learning_rate: self.learning_rate,
            batch_size: self.batch_size,
            seed: self.seed,
        }
    }

    pub fn active_paths(&self) -> ActivePaths<'_> {
        ActivePaths {
            train_data: self.train_data_filename.as_deref(),
            train_labels: self.train_label_filename.as_deref(),
            val_data: self.val_data_filename.as_deref(),
            val_labels: self.val_label_filename.as_deref(),
        }
    }

    pub fn passive_paths(&self) -> PassivePaths<'_> {
        PassivePaths {
            train_data: self.train_data_filename.as_deref(),
            val_data: self.val_data_filename.as_deref(),
        }
    }
}
