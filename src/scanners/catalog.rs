// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Vulnerability Catalog
 * Fixed signature tables driving detection and exploitation eligibility
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Finding, FindingType, Severity};

/// Static properties of each finding class
#[derive(Debug, Clone, Copy)]
pub struct FindingClass {
    pub finding_type: FindingType,
    pub severity: Severity,
    pub title: &'static str,
}

pub const FINDING_CLASSES: &[FindingClass] = &[
    FindingClass {
        finding_type: FindingType::VulnerableLibrary,
        severity: Severity::High,
        title: "Vulnerable JavaScript library",
    },
    FindingClass {
        finding_type: FindingType::SqlInjection,
        severity: Severity::Critical,
        title: "SQL injection",
    },
    FindingClass {
        finding_type: FindingType::Xss,
        severity: Severity::High,
        title: "Reflected cross-site scripting",
    },
    FindingClass {
        finding_type: FindingType::MissingSecurityHeaders,
        severity: Severity::Medium,
        title: "Missing security headers",
    },
];

pub fn class_of(finding_type: FindingType) -> &'static FindingClass {
    FINDING_CLASSES
        .iter()
        .find(|c| c.finding_type == finding_type)
        .unwrap_or(&FINDING_CLASSES[0])
}

/// A library version range known to carry CVEs
#[derive(Debug)]
pub struct LibrarySignature {
    pub library: &'static str,
    pub pattern: &'static str,
    pub cves: &'static [&'static str],
}

/// Catalog order is the order findings are reported in
pub const LIBRARY_CATALOG: &[LibrarySignature] = &[
    LibrarySignature {
        library: "axios",
        pattern: r"(?i)\baxios[\s@/-]*v?(?P<version>0\.\d+\.\d+|1\.[0-7]\.\d+|1\.8\.[01])\b",
        cves: &["CVE-2025-27152"],
    },
    LibrarySignature {
        library: "jquery",
        pattern: r"(?i)\bjquery[\s@/.-]*v?(?P<version>1\.\d+\.\d+|2\.\d+\.\d+|3\.[0-4]\.\d+)\b",
        cves: &["CVE-2020-11022", "CVE-2020-11023", "CVE-2019-11358", "CVE-2021-21349"],
    },
    LibrarySignature {
        library: "lodash",
        pattern: r"(?i)\blodash[\s@/.-]*v?(?P<version>4\.17\.(?:1[0-9]|20|[0-9]))\b",
        cves: &["CVE-2021-23337", "CVE-2020-8203"],
    },
    LibrarySignature {
        library: "angularjs",
        pattern: r"(?i)\bangular(?:js)?[\s@/.-]*v?(?P<version>1\.[0-7]\.\d+)\b",
        cves: &["CVE-2022-25844", "CVE-2019-14863"],
    },
    LibrarySignature {
        library: "bootstrap",
        pattern: r"(?i)\bbootstrap[\s@/.-]*v?(?P<version>3\.[0-3]\.\d+|3\.4\.0|4\.[0-2]\.\d+|4\.3\.0)\b",
        cves: &["CVE-2019-8331", "CVE-2018-14042"],
    },
    LibrarySignature {
        library: "moment",
        pattern: r"(?i)\bmoment(?:\.js)?[\s@/-]*v?(?P<version>2\.(?:[0-9]|1[0-9]|2[0-8])\.\d+|2\.29\.[0-3])\b",
        cves: &["CVE-2022-31129", "CVE-2022-24785"],
    },
];

static COMPILED_LIBRARIES: Lazy<Vec<(&'static LibrarySignature, Regex)>> = Lazy::new(|| {
    LIBRARY_CATALOG
        .iter()
        .filter_map(|sig| Regex::new(sig.pattern).ok().map(|re| (sig, re)))
        .collect()
});

/// Library matches in catalog order, at most one per catalog entry
pub fn match_libraries(body: &str) -> Vec<(&'static LibrarySignature, String)> {
    COMPILED_LIBRARIES
        .iter()
        .filter_map(|(sig, re)| re.find(body).map(|m| (*sig, m.as_str().to_string())))
        .collect()
}

/// CVEs for which a follow-up SSRF probe is attempted
pub const EXPLOITABLE_CVES: &[&str] = &["CVE-2025-27152", "CVE-2021-21349"];

/// The first exploitable CVE carried by a finding, if any
pub fn exploitable_cve(finding: &Finding) -> Option<&'static str> {
    EXPLOITABLE_CVES
        .iter()
        .find(|cve| finding.cves.iter().any(|c| c == *cve))
        .copied()
}

/// Database error signatures, matched case-insensitively
const SQL_ERROR_SIGNATURES: &[(&str, &str)] = &[
    ("MySQL", r"you have an error in your sql syntax"),
    ("MySQL", r"warning:\s*mysqli?_"),
    ("MySQL", r"mysql_fetch_(?:array|assoc|row)\(\)"),
    ("PostgreSQL", r"pg_query\(\)|pg_exec\(\)"),
    ("PostgreSQL", r"syntax error at or near"),
    ("PostgreSQL", r"unterminated quoted string at or near"),
    ("SQL Server", r"unclosed quotation mark after the character string"),
    ("SQL Server", r"microsoft ole db provider for (?:odbc drivers|sql server)"),
    ("Oracle", r"\bora-\d{5}\b"),
    ("Oracle", r"quoted string not properly terminated"),
    ("SQLite", r"sqlite3?::|sqlite_error|unrecognized token:"),
    ("Generic", r"sqlstate\[\w+\]"),
];

static COMPILED_SQL_ERRORS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SQL_ERROR_SIGNATURES
        .iter()
        .filter_map(|(db, pattern)| {
            Regex::new(&format!("(?i){}", pattern))
                .ok()
                .map(|re| (*db, re))
        })
        .collect()
});

/// Database family whose error signature appears in the body
pub fn match_sql_error(body: &str) -> Option<&'static str> {
    COMPILED_SQL_ERRORS
        .iter()
        .find(|(_, re)| re.is_match(body))
        .map(|(db, _)| *db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_signature_compiles() {
        assert_eq!(COMPILED_LIBRARIES.len(), LIBRARY_CATALOG.len());
        assert_eq!(COMPILED_SQL_ERRORS.len(), SQL_ERROR_SIGNATURES.len());
    }

    #[test]
    fn test_axios_versions() {
        let hits = match_libraries("bundle: axios v1.6.5 loaded");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.library, "axios");
        assert!(hits[0].0.cves.contains(&"CVE-2025-27152"));

        assert!(match_libraries("bundle: axios v2.0.0 loaded").is_empty());
        assert!(match_libraries("axios@1.8.2").is_empty());
        assert_eq!(match_libraries("axios@1.8.1").len(), 1);
    }

    #[test]
    fn test_jquery_versions() {
        let hits = match_libraries(r#"<script src="/js/jquery-1.12.4.min.js"></script>"#);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].0.cves.contains(&"CVE-2021-21349"));

        assert_eq!(match_libraries("jquery 1.12.4").len(), 1);
        assert!(match_libraries("jquery 3.7.1").is_empty());
    }

    #[test]
    fn test_sql_error_signatures() {
        assert_eq!(
            match_sql_error("You have an error in your SQL syntax; check the manual"),
            Some("MySQL")
        );
        assert_eq!(
            match_sql_error("ERROR: syntax error at or near \"'\""),
            Some("PostgreSQL")
        );
        assert_eq!(match_sql_error("ORA-01756: quoted string not properly terminated"), Some("Oracle"));
        assert_eq!(
            match_sql_error("We sell fine structured query books, syntax guides and more."),
            None
        );
    }

    #[test]
    fn test_exploitable_cve() {
        let finding = Finding::new(
            FindingType::VulnerableLibrary,
            Severity::High,
            "http://t.test",
            "jquery",
            "jquery 1.12.4",
        )
        .with_cves(&["CVE-2020-11022", "CVE-2021-21349"]);
        assert_eq!(exploitable_cve(&finding), Some("CVE-2021-21349"));

        let finding = finding.with_cves(&["CVE-2020-11022"]);
        assert_eq!(exploitable_cve(&finding), None);
    }

    #[test]
    fn test_class_table_covers_every_type() {
        for t in [
            FindingType::VulnerableLibrary,
            FindingType::SqlInjection,
            FindingType::Xss,
            FindingType::MissingSecurityHeaders,
        ] {
            assert_eq!(class_of(t).finding_type, t);
        }
        assert_eq!(class_of(FindingType::SqlInjection).severity, Severity::Critical);
    }
}
