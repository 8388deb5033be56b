// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Settings are stored as TOML through `confy` and every field has a serde
//! default, so a partial or outdated file still loads. Command line flags
//! override the stored values for a single run without writing them back.

use std::time::Duration;

use flightdeck_client::{ClientConfig, SchedulerConfig, DEFAULT_PLANESPOTTERS_BASE};
use log::info;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "flightdeck";
const CONFIG_NAME: &str = "config";

/// Default backend address
pub const DEFAULT_API_BASE: &str = "http://localhost:8080";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Flight logging backend base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Photo lookup service base URL
    #[serde(default = "default_photo_api_base")]
    pub photo_api_base: String,

    /// Maximum flights fetched per refresh
    #[serde(default = "default_flight_limit")]
    pub flight_limit: usize,

    /// Data poll period in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Display clock period in milliseconds
    #[serde(default = "default_clock_interval_ms")]
    pub clock_interval_ms: u64,

    /// Pause between photo lookups when expanding all rows
    #[serde(default = "default_photo_fill_delay_ms")]
    pub photo_fill_delay_ms: u64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// IATA codes highlighted as local airports
    #[serde(default = "default_local_airports")]
    pub local_airports: Vec<String>,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_photo_api_base() -> String {
    DEFAULT_PLANESPOTTERS_BASE.to_string()
}

fn default_flight_limit() -> usize {
    150
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_clock_interval_ms() -> u64 {
    1000
}

fn default_photo_fill_delay_ms() -> u64 {
    220
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_local_airports() -> Vec<String> {
    ["DTW", "DET", "YIP", "PTK", "ARB"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            api_base: default_api_base(),
            photo_api_base: default_photo_api_base(),
            flight_limit: default_flight_limit(),
            poll_interval_ms: default_poll_interval_ms(),
            clock_interval_ms: default_clock_interval_ms(),
            photo_fill_delay_ms: default_photo_fill_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            local_airports: default_local_airports(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        let config: AppConfig = confy::load(APP_NAME, CONFIG_NAME)?;
        info!("Loaded configuration (backend {})", config.api_base);
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Build the client library configuration
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_base: self.api_base.clone(),
            photo_api_base: self.photo_api_base.clone(),
            flight_limit: self.flight_limit,
            scheduler: SchedulerConfig {
                poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
                clock_interval: Duration::from_millis(self.clock_interval_ms.max(1)),
            },
            photo_fill_delay: Duration::from_millis(self.photo_fill_delay_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..ClientConfig::default()
        }
    }
}
