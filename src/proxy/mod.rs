// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod discovery;
pub mod pool;
pub mod record;

pub use pool::{ProbeOutcome, ProxyPool};
pub use record::{
    parse_host_port, parse_proxy_uri, ProxyCredentials, ProxyHealth, ProxyProtocol, ProxyRecord,
};
