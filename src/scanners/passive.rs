// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use super::catalog::{class_of, match_libraries};
use crate::types::{Finding, FindingType};

/// Classify already-fetched content against the library catalog.
/// Pure and deterministic; findings follow catalog order.
pub fn scan_body(body: &str, url: &str) -> Vec<Finding> {
    let class = class_of(FindingType::VulnerableLibrary);

    match_libraries(body)
        .into_iter()
        .map(|(signature, evidence)| {
            Finding::new(
                FindingType::VulnerableLibrary,
                class.severity,
                url,
                format!(
                    "{}: {} version with known vulnerabilities ({})",
                    class.title,
                    signature.library,
                    signature.cves.join(", ")
                ),
                evidence,
            )
            .with_cves(signature.cves)
        })
        .collect()
}
