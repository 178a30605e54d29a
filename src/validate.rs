//! Request-side validation of pagination and RAG parameters.
//!
//! One table of [`Bound`]s, built from the configuration, replaces scattered
//! per-route checks. Each bound names its default, its optional ceiling, and
//! what a ceiling violation does:
//!
//! | parameter     | default          | ceiling              | on violation |
//! |---------------|------------------|----------------------|--------------|
//! | `num_results` | `items_per_page` | `max_items_per_page` | reject (400) |
//! | `p` (page)    | 1                | `max_search_pages`   | fall back to 1 |
//! | `offset`      | 0                | none                 | —            |
//!
//! Malformed numeric values are always corrected to the default; only an
//! explicit, well-formed value above a rejecting ceiling produces an error.
//! All checks run before any backend call.

use crate::config::{PaginationConfig, RagConfig};
use crate::error::{RelayError, Result};

/// What happens when a well-formed value exceeds its ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnViolation {
    /// Refuse the request with a client error.
    Reject,
    /// Silently substitute the default.
    Fallback,
}

/// Validation rule for one numeric parameter.
#[derive(Debug, Clone, Copy)]
pub struct Bound {
    pub name: &'static str,
    pub default: u64,
    pub floor: u64,
    pub ceiling: Option<u64>,
    pub on_violation: OnViolation,
}

impl Bound {
    /// Resolve a raw parameter value against this bound.
    ///
    /// Absent, unparseable, and below-floor values become the default.
    /// Values above the ceiling follow [`OnViolation`].
    pub fn resolve(&self, raw: Option<&str>) -> Result<u64> {
        let Some(raw) = raw else {
            return Ok(self.default);
        };
        let Ok(value) = raw.parse::<u64>() else {
            return Ok(self.default);
        };
        self.apply(value)
    }

    /// Apply the floor and ceiling to an already-parsed value.
    pub fn apply(&self, value: u64) -> Result<u64> {
        if value < self.floor {
            return Ok(self.default);
        }
        if let Some(ceiling) = self.ceiling {
            if value > ceiling {
                return match self.on_violation {
                    OnViolation::Reject => Err(RelayError::LimitExceeded {
                        name: self.name,
                        value,
                        max: ceiling,
                    }),
                    OnViolation::Fallback => Ok(self.default),
                };
            }
        }
        Ok(value)
    }
}

/// The bound table plus the RAG bundle ceiling, built once from config.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub num_results: Bound,
    pub page: Bound,
    pub offset: Bound,
    pub max_rag_documents: u64,
}

impl Bounds {
    pub fn new(pagination: &PaginationConfig, rag: &RagConfig) -> Self {
        Self {
            num_results: Bound {
                name: "num_results",
                default: pagination.items_per_page,
                floor: 0,
                ceiling: Some(pagination.max_items_per_page),
                on_violation: OnViolation::Reject,
            },
            page: Bound {
                name: "p",
                default: 1,
                floor: 1,
                ceiling: Some(pagination.max_search_pages),
                on_violation: OnViolation::Fallback,
            },
            offset: Bound {
                name: "offset",
                default: 0,
                floor: 0,
                ceiling: None,
                on_violation: OnViolation::Fallback,
            },
            max_rag_documents: rag.max_documents,
        }
    }

    /// Result count for list endpoints. Rejects explicit oversized values.
    pub fn num_results(&self, raw: Option<&str>) -> Result<u64> {
        self.num_results.resolve(raw)
    }

    /// Page number. Never fails: anything unusable becomes page 1.
    pub fn page(&self, raw: Option<&str>) -> u64 {
        self.page.resolve(raw).unwrap_or(self.page.default)
    }

    /// Page number from an already-parsed value, with the same fallback
    /// behavior as [`Bounds::page`].
    pub fn page_value(&self, value: u64) -> u64 {
        self.page.apply(value).unwrap_or(self.page.default)
    }

    /// Item offset for list endpoints. Never fails.
    pub fn offset(&self, raw: Option<&str>) -> u64 {
        self.offset.resolve(raw).unwrap_or(self.offset.default)
    }

    /// Validate a RAG request into a [`RagBundle`].
    ///
    /// The corpus and document lists must pair up one-to-one, be non-empty,
    /// and stay within the configured document ceiling.
    pub fn rag_bundle(
        &self,
        model_name: &str,
        query: &str,
        corpus_names: Vec<String>,
        document_ids: Vec<String>,
    ) -> Result<RagBundle> {
        if model_name.trim().is_empty() {
            return Err(RelayError::MissingParam("model_name"));
        }
        if query.trim().is_empty() {
            return Err(RelayError::MissingParam("q"));
        }
        if corpus_names.len() != document_ids.len() {
            return Err(RelayError::InvalidParam {
                name: "document_id",
                reason: format!(
                    "expected one corpus_name per document_id, got {} and {}",
                    corpus_names.len(),
                    document_ids.len()
                ),
            });
        }
        if document_ids.is_empty() {
            return Err(RelayError::InvalidParam {
                name: "document_id",
                reason: "at least one document is required".to_string(),
            });
        }
        if document_ids.len() as u64 > self.max_rag_documents {
            return Err(RelayError::LimitExceeded {
                name: "document_id",
                value: document_ids.len() as u64,
                max: self.max_rag_documents,
            });
        }
        Ok(RagBundle {
            model_name: model_name.to_string(),
            query: query.to_string(),
            corpus_names,
            document_ids,
        })
    }
}

/// Interpret an ordering flag: absent or blank means descending.
pub fn order_desc(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(value) if value.is_empty() => true,
        Some(value) => value == "true",
    }
}

/// Keep a requested language only if the backend supports it.
/// Unsupported selections are dropped, not rejected.
pub fn language<'a>(raw: Option<&'a str>, available: &[String]) -> Option<&'a str> {
    raw.filter(|requested| available.iter().any(|lang| lang == requested))
}

/// A validated RAG request: a generation model, a question, and parallel
/// corpus/document lists of equal length.
///
/// Constructed only through [`Bounds::rag_bundle`].
#[derive(Debug, Clone)]
pub struct RagBundle {
    model_name: String,
    query: String,
    corpus_names: Vec<String>,
    document_ids: Vec<String>,
}

impl RagBundle {
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn corpus_names(&self) -> &[String] {
        &self.corpus_names
    }

    pub fn document_ids(&self) -> &[String] {
        &self.document_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bounds() -> Bounds {
        Bounds::new(
            &PaginationConfig {
                items_per_page: 10,
                max_items_per_page: 100,
                search_results_per_page: 10,
                max_search_pages: 50,
            },
            &RagConfig { max_documents: 4 },
        )
    }

    #[test]
    fn test_num_results_default_and_pass_through() {
        let bounds = test_bounds();
        assert_eq!(bounds.num_results(None).unwrap(), 10);
        assert_eq!(bounds.num_results(Some("25")).unwrap(), 25);
        assert_eq!(bounds.num_results(Some("100")).unwrap(), 100);
    }

    #[test]
    fn test_num_results_malformed_becomes_default() {
        let bounds = test_bounds();
        assert_eq!(bounds.num_results(Some("abc")).unwrap(), 10);
        assert_eq!(bounds.num_results(Some("")).unwrap(), 10);
        assert_eq!(bounds.num_results(Some("-3")).unwrap(), 10);
        assert_eq!(bounds.num_results(Some("2.5")).unwrap(), 10);
    }

    #[test]
    fn test_num_results_over_ceiling_is_rejected() {
        let bounds = test_bounds();
        let err = bounds.num_results(Some("101")).unwrap_err();
        assert!(matches!(
            err,
            RelayError::LimitExceeded {
                name: "num_results",
                value: 101,
                max: 100,
            }
        ));
    }

    #[test]
    fn test_page_falls_back_to_one() {
        let bounds = test_bounds();
        assert_eq!(bounds.page(None), 1);
        assert_eq!(bounds.page(Some("abc")), 1);
        assert_eq!(bounds.page(Some("0")), 1);
        assert_eq!(bounds.page(Some("-2")), 1);
        assert_eq!(bounds.page(Some("3.5")), 1);
        // above the ceiling falls back instead of rejecting
        assert_eq!(bounds.page(Some("51")), 1);
        assert_eq!(bounds.page(Some("7")), 7);
        assert_eq!(bounds.page(Some("50")), 50);
    }

    #[test]
    fn test_page_value_normalizes_parsed_numbers() {
        let bounds = test_bounds();
        assert_eq!(bounds.page_value(0), 1);
        assert_eq!(bounds.page_value(7), 7);
        assert_eq!(bounds.page_value(51), 1);
        assert_eq!(bounds.page_value(u64::MAX), 1);
    }

    #[test]
    fn test_offset_defaults_to_zero() {
        let bounds = test_bounds();
        assert_eq!(bounds.offset(None), 0);
        assert_eq!(bounds.offset(Some("nope")), 0);
        assert_eq!(bounds.offset(Some("40")), 40);
    }

    #[test]
    fn test_order_desc_parsing() {
        assert!(order_desc(None));
        assert!(order_desc(Some("")));
        assert!(order_desc(Some("true")));
        assert!(!order_desc(Some("false")));
        assert!(!order_desc(Some("TRUE")));
        assert!(!order_desc(Some("1")));
    }

    #[test]
    fn test_language_kept_only_when_available() {
        let available = vec!["English".to_string(), "German".to_string()];
        assert_eq!(language(Some("German"), &available), Some("German"));
        assert_eq!(language(Some("Klingon"), &available), None);
        assert_eq!(language(None, &available), None);
    }

    #[test]
    fn test_rag_bundle_happy_path() {
        let bounds = test_bounds();
        let bundle = bounds
            .rag_bundle(
                "gpt-4",
                "why is the sky blue",
                vec!["a".into(), "b".into()],
                vec!["d1".into(), "d2".into()],
            )
            .unwrap();
        assert_eq!(bundle.model_name(), "gpt-4");
        assert_eq!(bundle.corpus_names(), ["a", "b"]);
        assert_eq!(bundle.document_ids(), ["d1", "d2"]);
    }

    #[test]
    fn test_rag_bundle_requires_model_and_query() {
        let bounds = test_bounds();
        assert!(matches!(
            bounds.rag_bundle("", "q", vec!["a".into()], vec!["d".into()]),
            Err(RelayError::MissingParam("model_name"))
        ));
        assert!(matches!(
            bounds.rag_bundle("m", "  ", vec!["a".into()], vec!["d".into()]),
            Err(RelayError::MissingParam("q"))
        ));
    }

    #[test]
    fn test_rag_bundle_rejects_mismatched_lists() {
        let bounds = test_bounds();
        let err = bounds
            .rag_bundle("m", "q", vec!["a".into(), "b".into()], vec!["d".into()])
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidParam { .. }));
    }

    #[test]
    fn test_rag_bundle_rejects_empty_and_oversized() {
        let bounds = test_bounds();
        assert!(matches!(
            bounds.rag_bundle("m", "q", vec![], vec![]),
            Err(RelayError::InvalidParam { .. })
        ));

        let five = |prefix: &str| -> Vec<String> {
            (0..5).map(|i| format!("{prefix}{i}")).collect()
        };
        assert!(matches!(
            bounds.rag_bundle("m", "q", five("c"), five("d")),
            Err(RelayError::LimitExceeded { max: 4, .. })
        ));
    }
}
