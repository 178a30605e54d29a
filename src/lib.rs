//! # Corpus Relay
//!
//! A validating gateway and CLI for corpus retrieval backends.
//!
//! Corpus Relay sits between browser frontends and a corpus retrieval
//! backend. It checks and bounds request parameters, builds canonical
//! backend query strings, maps responses into typed records, computes
//! pagination with stable navigation links, and exposes the result as a
//! JSON API (`crelay serve`) and a terminal CLI (`crelay`).
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐        ┌──────────────┐        ┌───────────┐
//! │  Browser  │──────▶ │   gateway    │──────▶ │ Retrieval │
//! │ frontends │  HTTP  │  (validate,  │  HTTP  │  backend  │
//! └───────────┘        │   paginate)  │        └───────────┘
//!                      └──────────────┘              ▲
//!                      ┌──────────────┐              │
//!                      │ CLI (crelay) │──────────────┘
//!                      └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! crelay corpora                        # list corpora with counts
//! crelay datasets msmarco               # datasets of one corpus
//! crelay search "neural retrieval" --page 2
//! crelay document msmarco D88 --summarize gpt-4o
//! crelay serve                          # start the JSON gateway
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error type shared across the crate |
//! | [`models`] | Typed records for the backend wire format |
//! | [`params`] | Ordered multi-valued query pairs |
//! | [`validate`] | Parameter bounds and request validation |
//! | [`pagination`] | Page math and navigation links |
//! | [`client`] | HTTP client for the retrieval backend |
//! | [`server`] | Gateway HTTP server |
//! | [`browse`] | CLI catalog views |
//! | [`search`] | CLI search and RAG answers |
//! | [`humanize`] | Human-readable counts and excerpts |

pub mod browse;
pub mod client;
pub mod config;
pub mod error;
pub mod humanize;
pub mod models;
pub mod pagination;
pub mod params;
pub mod search;
pub mod server;
pub mod validate;
