//! Typed records for the retrieval backend's wire format.
//!
//! The backend speaks snake_case JSON. Flat shapes (corpora, datasets,
//! queries, documents, search hits) deserialize directly; relevance
//! judgments arrive as [`QrelRecord`]s with a nested `query_info` or
//! `document_info` object that is flattened into [`RelevantQuery`] /
//! [`RelevantDocument`] before leaving this layer.

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// A corpus with its summary counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpus {
    pub name: String,
    pub language: String,
    pub num_datasets: u64,
    pub num_documents: u64,
}

/// A relevance-judgment dataset within a corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub corpus_name: String,
    pub min_relevance: i64,
    pub num_queries: u64,
}

/// A query belonging to a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub id: String,
    pub text: String,
    pub description: Option<String>,
    pub corpus_name: String,
    pub dataset_name: String,
    pub num_relevant_documents: u64,
}

/// A document belonging to a corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: Option<String>,
    pub text: String,
    pub corpus_name: String,
    pub num_relevant_queries: u64,
}

/// One full-text search hit, scored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: Option<String>,
    pub snippet: String,
    pub score: f64,
    pub corpus_name: String,
}

/// Search options advertised by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    pub query_languages: Vec<String>,
    pub corpus_names: Vec<String>,
    /// Generation models for RAG answers. Older backends omit this field.
    #[serde(default)]
    pub model_names: Vec<String>,
}

/// One page of a paginated backend response.
///
/// The wire calls the total `total_num_items`; that name is kept on the
/// JSON side so pages can be passed through unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "total_num_items")]
    pub total_items: u64,
    pub offset: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Convert every item, keeping the pagination envelope. Fails on the
    /// first item that does not convert.
    pub fn try_map<U, F>(self, f: F) -> Result<Page<U>>
    where
        F: FnMut(T) -> Result<U>,
    {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<U>>>()?;
        Ok(Page {
            total_items: self.total_items,
            offset: self.offset,
            items,
        })
    }
}

/// Nested query fields inside a relevance judgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInfo {
    pub id: String,
    pub text: String,
    pub description: Option<String>,
}

/// Nested document fields inside a relevance judgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub title: Option<String>,
    pub text: String,
}

/// A raw relevance judgment as returned by `get_qrels`.
///
/// Which nested object is populated depends on the direction of the lookup.
/// Conversion into the flattened types checks for the expected side and
/// rejects records that lack it rather than inventing placeholder values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrelRecord {
    pub query_info: Option<QueryInfo>,
    pub document_info: Option<DocumentInfo>,
    pub relevance: i64,
    pub corpus_name: String,
    pub dataset_name: String,
}

/// A query known to be relevant for some document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevantQuery {
    pub id: String,
    pub text: String,
    pub corpus_name: String,
    pub dataset_name: String,
    pub relevance: i64,
}

/// A document known to be relevant for some query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevantDocument {
    pub id: String,
    pub text: String,
    pub corpus_name: String,
    pub relevance: i64,
}

impl QrelRecord {
    /// Flatten a query-side judgment. Fails if `query_info` is absent.
    pub fn into_relevant_query(self) -> Result<RelevantQuery> {
        let info = self.query_info.ok_or_else(|| {
            RelayError::UnexpectedShape("relevance judgment without query_info".to_string())
        })?;
        Ok(RelevantQuery {
            id: info.id,
            text: info.text,
            corpus_name: self.corpus_name,
            dataset_name: self.dataset_name,
            relevance: self.relevance,
        })
    }

    /// Flatten a document-side judgment. Fails if `document_info` is absent.
    pub fn into_relevant_document(self) -> Result<RelevantDocument> {
        let info = self.document_info.ok_or_else(|| {
            RelayError::UnexpectedShape("relevance judgment without document_info".to_string())
        })?;
        Ok(RelevantDocument {
            id: info.id,
            text: info.text,
            corpus_name: self.corpus_name,
            relevance: self.relevance,
        })
    }
}
