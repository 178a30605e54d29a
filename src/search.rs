use anyhow::Result;

use crate::client::RetrievalClient;
use crate::config::Config;
use crate::humanize;
use crate::pagination;
use crate::validate::{self, Bounds};

/// Run the search command: one page of hits, numbered by absolute rank.
pub async fn run_search(
    config: &Config,
    query: &str,
    language: Option<&str>,
    corpus_names: &[String],
    page: u64,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    // The gateway's bound table applies here too: page 0 and anything
    // over the ceiling become page 1.
    let bounds = Bounds::new(&config.pagination, &config.rag);
    let page = bounds.page_value(page);

    let client = RetrievalClient::new(&config.backend)?;

    // Same rule as the gateway: an unsupported language is dropped, not an error
    let resolved_language = match language {
        Some(requested) => {
            let available = client.available_languages().await?;
            let resolved = validate::language(Some(requested), &available);
            if resolved.is_none() {
                eprintln!(
                    "Language '{}' is not available; searching all languages.",
                    requested
                );
            }
            resolved.map(str::to_string)
        }
        None => None,
    };

    let per_page = config.pagination.search_results_per_page;
    let result = client
        .search(
            query,
            resolved_language.as_deref(),
            corpus_names,
            per_page,
            page,
        )
        .await?;

    let total = pagination::total_pages(result.total_items, per_page);
    if total == 0 {
        println!("No results.");
        return Ok(());
    }
    if page > total {
        println!("Page {} is past the end; the last page is {}.", page, total);
        return Ok(());
    }

    let first_rank = pagination::offset_for_page(page, per_page) + 1;
    for (i, hit) in result.items.iter().enumerate() {
        let title = hit.title.as_deref().unwrap_or("(untitled)");
        println!(
            "{}. [{:.2}] {} / {}",
            first_rank + i as u64,
            hit.score,
            hit.corpus_name,
            title
        );
        println!(
            "    excerpt: \"{}\"",
            humanize::excerpt(&hit.snippet, config.display.snippet_length)
        );
        println!("    id: {}", hit.id);
        println!();
    }

    println!(
        "Page {} of {} ({} results)",
        page,
        total,
        humanize::human_count(result.total_items)
    );

    Ok(())
}

/// Run the answer command: generate a RAG answer over explicitly chosen
/// documents, given as `(corpus, document)` pairs.
pub async fn run_answer(
    config: &Config,
    model_name: &str,
    query: &str,
    documents: &[(String, String)],
) -> Result<()> {
    let bounds = Bounds::new(&config.pagination, &config.rag);
    let (corpus_names, document_ids): (Vec<String>, Vec<String>) =
        documents.iter().cloned().unzip();
    let bundle = bounds.rag_bundle(model_name, query, corpus_names, document_ids)?;

    let client = RetrievalClient::new(&config.backend)?;
    let answer = client.answer(&bundle).await?;
    println!("{}", answer);

    Ok(())
}
