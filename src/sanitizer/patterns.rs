use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};

/// One entry in the pattern catalog, as read from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    pub name: String,
    pub regex: String,
    pub marker: String,
}

/// A compiled pattern ready for matching. Ordering within the catalog is
/// significant only when a substring could be matched by more than one pattern;
/// the first pattern wins and later patterns are applied to the already-marked
/// string, so markers themselves must never match any pattern (checked at
/// startup by [`PatternCatalog::compile`]).
pub struct CompiledPattern {
    pub name: String,
    pub regex: Regex,
    pub marker: String,
}

/// The ordered list of compiled patterns the Sanitizer applies to headers, query
/// values, and body leaves.
pub struct PatternCatalog {
    patterns: Vec<CompiledPattern>,
}

impl PatternCatalog {
    /// Compile a configured pattern list, rejecting configurations where a marker
    /// would itself be re-matched by any pattern (a well-formedness check the spec
    /// requires to hold at startup).
    pub fn compile(configs: &[PatternConfig]) -> Result<Self> {
        let mut patterns = Vec::with_capacity(configs.len());
        for cfg in configs {
            let regex = Regex::new(&cfg.regex).map_err(|e| {
                CaptureError::config(format!("pattern '{}' has an invalid regex: {}", cfg.name, e))
            })?;
            patterns.push(CompiledPattern {
                name: cfg.name.clone(),
                regex,
                marker: cfg.marker.clone(),
            });
        }

        for pattern in &patterns {
            for other in &patterns {
                if other.regex.is_match(&pattern.marker) {
                    return Err(CaptureError::config(format!(
                        "marker '{}' (pattern '{}') is itself matched by pattern '{}'; markers must never match a pattern",
                        pattern.marker, pattern.name, other.name
                    )));
                }
            }
        }

        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    /// Apply every pattern in order to `input`, returning the substituted string and
    /// the per-pattern number of substitutions made. Later patterns see the output of
    /// earlier ones, so a marker inserted by pattern N is never re-matched by pattern
    /// N+1 as long as the startup well-formedness check held.
    pub fn apply(&self, input: &str, report: &mut std::collections::BTreeMap<String, u32>) -> String {
        let mut current = input.to_string();
        for pattern in &self.patterns {
            let mut count = 0u32;
            let replaced = pattern.regex.replace_all(&current, |_: &regex::Captures| {
                count += 1;
                pattern.marker.clone()
            });
            if count > 0 {
                *report.entry(pattern.name.clone()).or_insert(0) += count;
                current = replaced.into_owned();
            }
        }
        current
    }

    /// Re-scan `input` against every pattern; used for the fail-closed leak check.
    /// Returns the name of the first pattern that still matches, if any.
    pub fn first_match(&self, input: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|pattern| pattern.regex.is_match(input))
            .map(|pattern| pattern.name.as_str())
    }

    /// The default catalog: JWTs, bearer/basic auth values, API keys, emails,
    /// credit-card-shaped digit runs (Luhn not required, by design — see DESIGN.md),
    /// national IDs, phone numbers. Field-name-driven redaction (passwords, secrets)
    /// is handled separately by the JSON walker's field-name deny-list.
    pub fn default_configs() -> Vec<PatternConfig> {
        vec![
            PatternConfig {
                name: "jwt".to_string(),
                regex: r"eyJ[A-Za-z0-9_-]+\.eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+".to_string(),
                marker: "SANITIZED_JWT".to_string(),
            },
            PatternConfig {
                name: "bearer_token".to_string(),
                regex: r"(?i)bearer\s+[a-zA-Z0-9._~+/=-]{8,}".to_string(),
                marker: "SANITIZED_BEARER".to_string(),
            },
            PatternConfig {
                name: "basic_auth".to_string(),
                regex: r"(?i)basic\s+[a-zA-Z0-9+/=]{8,}".to_string(),
                marker: "SANITIZED_BASIC_AUTH".to_string(),
            },
            PatternConfig {
                name: "api_key".to_string(),
                regex: r"(?i)(api[_-]?key|x-api-key)[\s\:=]+[a-zA-Z0-9_-]{16,}".to_string(),
                marker: "SANITIZED_API_KEY".to_string(),
            },
            PatternConfig {
                name: "email".to_string(),
                regex: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b".to_string(),
                marker: "SANITIZED_EMAIL".to_string(),
            },
            PatternConfig {
                name: "credit_card".to_string(),
                regex: r"\b\d{13,19}\b".to_string(),
                marker: "SANITIZED_CREDIT_CARD".to_string(),
            },
            PatternConfig {
                name: "us_ssn".to_string(),
                regex: r"\b\d{3}-\d{2}-\d{4}\b".to_string(),
                marker: "SANITIZED_SSN".to_string(),
            },
            PatternConfig {
                name: "cpf".to_string(),
                regex: r"\b\d{3}\.\d{3}\.\d{3}-\d{2}\b".to_string(),
                marker: "SANITIZED_CPF".to_string(),
            },
            PatternConfig {
                name: "cnpj".to_string(),
                regex: r"\b\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}\b".to_string(),
                marker: "SANITIZED_CNPJ".to_string(),
            },
            PatternConfig {
                name: "phone_number".to_string(),
                regex: r"\+?[1-9]\d{0,2}[-.\s]?\(?\d{2,4}\)?[-.\s]?\d{3,4}[-.\s]?\d{3,4}".to_string(),
                marker: "SANITIZED_PHONE".to_string(),
            },
        ]
    }

    pub fn default_header_denylist() -> Vec<String> {
        vec![
            "authorization".to_string(),
            "cookie".to_string(),
            "set-cookie".to_string(),
            "x-api-key".to_string(),
            "proxy-authorization".to_string(),
        ]
    }

    pub fn default_field_name_denylist() -> Vec<String> {
        vec![
            "password".to_string(),
            "passwd".to_string(),
            "pwd".to_string(),
            "secret".to_string(),
            "token".to_string(),
            "api_key".to_string(),
            "apikey".to_string(),
            "private_key".to_string(),
            "access_token".to_string(),
            "refresh_token".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_marker_that_matches_a_pattern() {
        let configs = vec![PatternConfig {
            name: "digits".to_string(),
            regex: r"\d+".to_string(),
            marker: "REDACTED_123".to_string(),
        }];
        assert!(PatternCatalog::compile(&configs).is_err());
    }

    #[test]
    fn default_catalog_compiles() {
        let catalog = PatternCatalog::compile(&PatternCatalog::default_configs()).unwrap();
        assert!(!catalog.patterns().is_empty());
    }

    #[test]
    fn apply_substitutes_and_counts() {
        let catalog = PatternCatalog::compile(&PatternCatalog::default_configs()).unwrap();
        let mut report = std::collections::BTreeMap::new();
        let out = catalog.apply("contact jane@example.com now", &mut report);
        assert!(out.contains("SANITIZED_EMAIL"));
        assert_eq!(report.get("email"), Some(&1));
    }
}
