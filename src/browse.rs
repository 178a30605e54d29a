//! CLI views over the corpus catalog.
//!
//! Implements `crelay corpora`, `crelay datasets`, `crelay document`, and
//! `crelay query`: quick terminal summaries of what the retrieval backend
//! is serving, with counts shortened to human-readable form.

use anyhow::Result;

use crate::client::{ListOptions, RetrievalClient};
use crate::config::Config;
use crate::humanize;

/// Run the corpora command: list every corpus with its counts.
pub async fn run_corpora(config: &Config) -> Result<()> {
    let client = RetrievalClient::new(&config.backend)?;
    let corpora = client.corpora().await?;

    if corpora.is_empty() {
        println!("No corpora.");
        return Ok(());
    }

    println!(
        "{:<24} {:<12} {:>9} {:>10}",
        "CORPUS", "LANGUAGE", "DATASETS", "DOCUMENTS"
    );
    println!("{}", "-".repeat(58));
    for corpus in &corpora {
        println!(
            "{:<24} {:<12} {:>9} {:>10}",
            corpus.name,
            corpus.language,
            humanize::human_count(corpus.num_datasets),
            humanize::human_count(corpus.num_documents)
        );
    }
    println!();
    println!("{} corpora", corpora.len());

    Ok(())
}

/// Run the datasets command: list the datasets of one corpus.
pub async fn run_datasets(config: &Config, corpus_name: &str) -> Result<()> {
    let client = RetrievalClient::new(&config.backend)?;
    let datasets = client.datasets(corpus_name).await?;

    if datasets.is_empty() {
        println!("No datasets in corpus '{}'.", corpus_name);
        return Ok(());
    }

    println!(
        "{:<32} {:>13} {:>9}",
        "DATASET", "MIN RELEVANCE", "QUERIES"
    );
    println!("{}", "-".repeat(56));
    for dataset in &datasets {
        println!(
            "{:<32} {:>13} {:>9}",
            dataset.name,
            dataset.min_relevance,
            humanize::human_count(dataset.num_queries)
        );
    }

    Ok(())
}

/// Run the document command: print one document, optionally with a model
/// summary, followed by the first page of queries judged relevant to it.
pub async fn run_document(
    config: &Config,
    corpus_name: &str,
    document_id: &str,
    summary_model: Option<&str>,
) -> Result<()> {
    let client = RetrievalClient::new(&config.backend)?;
    let document = client.document(corpus_name, document_id).await?;

    println!("--- Document ---");
    println!("  id:       {}", document.id);
    println!("  corpus:   {}", document.corpus_name);
    if let Some(ref title) = document.title {
        println!("  title:    {}", title);
    }
    println!(
        "  queries:  {} relevant",
        humanize::human_count(document.num_relevant_queries)
    );
    println!();
    println!("{}", document.text);

    if let Some(model) = summary_model {
        let summary = client
            .document_summary(corpus_name, document_id, model)
            .await?;
        println!();
        println!("--- Summary ({}) ---", model);
        println!("{}", summary);
    }

    // First page of judgments only
    let options = ListOptions {
        num_results: config.pagination.items_per_page,
        ..ListOptions::default()
    };
    let relevant = client
        .relevant_queries(document_id, corpus_name, &options)
        .await?;
    if !relevant.items.is_empty() {
        println!();
        println!("--- Relevant queries ({} total) ---", relevant.total_items);
        for query in &relevant.items {
            println!(
                "  [{:>3}] {} ({}/{})",
                query.relevance, query.text, query.corpus_name, query.dataset_name
            );
        }
    }

    Ok(())
}

/// Run the query command: print one query and the first page of documents
/// judged relevant to it.
pub async fn run_query(
    config: &Config,
    corpus_name: &str,
    dataset_name: &str,
    query_id: &str,
) -> Result<()> {
    let client = RetrievalClient::new(&config.backend)?;
    let query = client.query(corpus_name, dataset_name, query_id).await?;

    println!("--- Query ---");
    println!("  id:        {}", query.id);
    println!("  corpus:    {}", query.corpus_name);
    println!("  dataset:   {}", query.dataset_name);
    println!("  text:      {}", query.text);
    if let Some(ref description) = query.description {
        println!("  about:     {}", description);
    }
    println!(
        "  documents: {} relevant",
        humanize::human_count(query.num_relevant_documents)
    );

    let options = ListOptions {
        num_results: config.pagination.items_per_page,
        ..ListOptions::default()
    };
    let relevant = client
        .relevant_documents(query_id, dataset_name, corpus_name, &options)
        .await?;
    if !relevant.items.is_empty() {
        println!();
        println!(
            "--- Relevant documents ({} total) ---",
            relevant.total_items
        );
        for document in &relevant.items {
            println!(
                "  [{:>3}] {}  {}",
                document.relevance,
                document.id,
                humanize::excerpt(&document.text, config.display.snippet_length)
            );
        }
    }

    Ok(())
}
