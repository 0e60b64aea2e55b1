// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod core;
pub mod loader;
pub mod validation;

pub use core::{
    BrowserConfig, EngineConfig, HttpConfig, LogFormat, ObservabilityConfig, ProxyConfig,
    ScannerConfig,
};

pub use loader::{load_engine_config, load_from_env, ConfigFormat, ConfigLoader};

pub use validation::ConfigValidator;
