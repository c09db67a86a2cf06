//! devjournal CLI: review a topic, embed the journal, search it.
//!
//! Commands:
//!   devjournal review <topic> [--lang <language>] [--repo <id>]...
//!   devjournal embed [--repo <id>]...
//!   devjournal search <query> [--top <k>] [--repo <id>]...
//!
//! Configuration comes from the environment (see each crate's `from_env`);
//! a `.env` file next to the binary is honored.

use std::sync::Arc;

use anyhow::{Context, bail};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use commit_index::{CommitStore, EmbeddingIndex, RepoScope};
use journal_review::{ReviewConfig, ReviewPipeline, to_markdown};
use llm_service::{LlmProfiles, OllamaClient};
use web_research::{WebRetriever, config::ResearchConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; env vars set in the shell win either way.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };

    let journal_path = std::env::var("DEVJOURNAL_JOURNAL")
        .unwrap_or_else(|_| "devjournal-commits.jsonl".to_string());

    let mut pipeline = build_pipeline(&journal_path)
        .await
        .with_context(|| format!("starting pipeline over {journal_path}"))?;

    match command.as_str() {
        "review" => {
            let (positional, scope, lang, _k) = parse_tail(&args[1..])?;
            let Some(topic) = positional.first() else {
                bail!("usage: devjournal review <topic> [--lang <language>] [--repo <id>]...");
            };
            let report = pipeline.review(topic, lang.as_deref(), &scope).await?;

            if !report.degraded_reasons.is_empty() {
                println!("{}", "Degraded:".yellow().bold());
                for reason in &report.degraded_reasons {
                    println!("  {} {}", "!".yellow(), reason);
                }
                println!();
            }
            println!("{}", to_markdown(&report));
        }
        "embed" => {
            let (_, scope, _, _) = parse_tail(&args[1..])?;
            let summary = pipeline.embed_all(&scope, 4).await?;
            println!(
                "{} {} embedded, {} skipped",
                "done:".green().bold(),
                summary.embedded,
                summary.skipped
            );
        }
        "search" => {
            let (positional, scope, _, k) = parse_tail(&args[1..])?;
            let Some(query) = positional.first() else {
                bail!("usage: devjournal search <query> [--top <k>] [--repo <id>]...");
            };
            let hits = pipeline.semantic_search(query, k.unwrap_or(10), &scope).await?;
            if hits.is_empty() {
                println!("{}", "no matching commits".dimmed());
            }
            for hit in hits {
                let record = pipeline.store().get_commit(&hit.commit_id)?;
                println!(
                    "{} {} {}",
                    format!("[{:.2}]", hit.similarity_score).cyan(),
                    hit.commit_id.bold(),
                    record.message.lines().next().unwrap_or_default()
                );
            }
        }
        other => {
            print_usage();
            bail!("unknown command: {other}");
        }
    }

    Ok(())
}

async fn build_pipeline(journal_path: &str) -> anyhow::Result<ReviewPipeline> {
    let profiles = LlmProfiles::from_env();
    let embedder = Arc::new(OllamaClient::new(profiles.embedding)?);
    let generator = Arc::new(OllamaClient::new(profiles.generation)?);

    let store = CommitStore::load(journal_path)?;
    let index = Arc::new(EmbeddingIndex::new(embedder));
    index.seed_from_store(&store).await?;

    let retriever = WebRetriever::from_env(ResearchConfig::from_env())?;

    Ok(ReviewPipeline::new(
        store,
        index,
        retriever,
        generator,
        ReviewConfig::from_env(),
    ))
}

/// Splits trailing args into positionals and the shared flags.
#[allow(clippy::type_complexity)]
fn parse_tail(
    args: &[String],
) -> anyhow::Result<(Vec<String>, RepoScope, Option<String>, Option<usize>)> {
    let mut positional = Vec::new();
    let mut scope = RepoScope::new();
    let mut lang = None;
    let mut k = None;

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--repo" => {
                let value = it.next().context("--repo needs a repository id")?;
                scope.insert(value.clone());
            }
            "--lang" => lang = Some(it.next().context("--lang needs a language")?.clone()),
            "--top" => {
                k = Some(
                    it.next()
                        .context("--top needs a number")?
                        .parse()
                        .context("--top needs a number")?,
                );
            }
            _ => positional.push(arg.clone()),
        }
    }

    Ok((positional, scope, lang, k))
}

fn print_usage() {
    println!(
        "devjournal — personal developer journal\n\n\
         USAGE:\n  devjournal review <topic> [--lang <language>] [--repo <id>]...\n  \
         devjournal embed [--repo <id>]...\n  \
         devjournal search <query> [--top <k>] [--repo <id>]..."
    );
}
