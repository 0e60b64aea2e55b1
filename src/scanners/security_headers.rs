// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Security Headers Audit
 * Reports every missing browser security header in a single finding
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;

use super::catalog::class_of;
use crate::types::{Finding, FindingType};

pub const SECURITY_HEADERS: [&str; 5] = [
    "X-Frame-Options",
    "X-Content-Type-Options",
    "X-XSS-Protection",
    "Strict-Transport-Security",
    "Content-Security-Policy",
];

/// Header names from the audited set absent in `headers` (case-insensitive)
pub fn missing_security_headers(headers: &HashMap<String, String>) -> Vec<&'static str> {
    SECURITY_HEADERS
        .iter()
        .filter(|required| !headers.keys().any(|k| k.eq_ignore_ascii_case(required)))
        .copied()
        .collect()
}

/// One MEDIUM finding listing all missing headers, or none when all are present
pub fn audit_headers(headers: &HashMap<String, String>, url: &str) -> Option<Finding> {
    let missing = missing_security_headers(headers);
    if missing.is_empty() {
        return None;
    }

    let class = class_of(FindingType::MissingSecurityHeaders);
    Some(Finding::new(
        FindingType::MissingSecurityHeaders,
        class.severity,
        url,
        format!("{}: {} of {} not set", class.title, missing.len(), SECURITY_HEADERS.len()),
        format!("Missing: {}", missing.join(", ")),
    ))
}
