use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use delve::cli;
use delve::config::{self, AppConfig, SearchProviderKind};
use delve::llm::{GenaiModel, LanguageModel};
use delve::research::{
    DeepResearch, ProgressCallback, ReportWriter, ResearchOptions, ResearchProgress,
    ResearchRequest, ResearchState,
};
use delve::search::{DuckDuckGoSearch, FirecrawlSearch, SearchOptions, SearchProvider};
use delve::usage::UsageCounter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up provider API keys and FIRECRAWL_* settings from .env
    let _ = dotenvy::dotenv();

    // Initialize tracing (stderr, so stdout carries only results)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    tracing::info!("delve starting");

    let config = config::load_config(&cli)?;
    tracing::info!(
        model = %config.model,
        provider = ?config.search_provider,
        concurrency = config.concurrency_limit,
        "Config loaded"
    );

    let usage = Arc::new(UsageCounter::new());
    let llm: Arc<dyn LanguageModel> = Arc::new(
        GenaiModel::new(config.model.clone(), config.llm_max_retries)
            .with_usage_counter(usage.clone()),
    );
    let engine = DeepResearch::new(
        llm.clone(),
        build_search_provider(&config),
        research_options(&config),
    )
    .with_usage_counter(usage.clone());

    let args = cli.command.args();
    let request = ResearchRequest::new(
        args.query.clone(),
        usize::from(args.breadth),
        usize::from(args.depth),
    );

    let state = engine
        .research(request, Some(progress_logger()))
        .await
        .context("Research failed")?;

    let output = match &cli.command {
        cli::Commands::Research(_) => format_learnings(&state),
        cli::Commands::Report(args) => {
            ReportWriter::new(llm.clone(), config.context_tokens)
                .write_final_report(&args.query, &state.learnings, &state.visited_urls)
                .await
                .context("Failed to write report")?
        }
        cli::Commands::Answer(args) => {
            ReportWriter::new(llm.clone(), config.context_tokens)
                .write_final_answer(&args.query, &state.learnings)
                .await
                .context("Failed to write answer")?
        }
    };

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &output)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote result to {}", path.display());
        }
        None => println!("{output}"),
    }

    tracing::info!("\n{}", usage.formatted());

    Ok(())
}

fn build_search_provider(config: &AppConfig) -> Arc<dyn SearchProvider> {
    match config.search_provider {
        SearchProviderKind::Firecrawl => {
            if config.firecrawl_api_key.is_none() {
                tracing::warn!("No FIRECRAWL_KEY configured; requests are sent unauthenticated");
            }
            Arc::new(FirecrawlSearch::new(
                config.firecrawl_api_key.clone().unwrap_or_default(),
                config.firecrawl_base_url.clone(),
            ))
        }
        SearchProviderKind::Duckduckgo => Arc::new(DuckDuckGoSearch::new()),
    }
}

fn research_options(config: &AppConfig) -> ResearchOptions {
    ResearchOptions {
        concurrency_limit: config.concurrency_limit,
        search: SearchOptions {
            timeout: Duration::from_secs(config.search_timeout_secs),
            limit: config.search_result_limit,
            format: config.content_format,
        },
        max_learnings: config.max_learnings,
        context_tokens: config.context_tokens,
    }
}

fn progress_logger() -> ProgressCallback {
    Arc::new(|p: &ResearchProgress| {
        tracing::info!(
            depth = %format!("{}/{}", p.current_depth, p.total_depth),
            breadth = %format!("{}/{}", p.current_breadth, p.total_breadth),
            queries = %format!("{}/{}", p.completed_queries, p.total_queries),
            current = p.current_query.as_deref().unwrap_or(""),
            "Progress"
        );
    })
}

fn format_learnings(state: &ResearchState) -> String {
    format!(
        "Learnings:\n\n{}\n\nVisited URLs ({}):\n\n{}",
        state.learnings.join("\n"),
        state.visited_urls.len(),
        state.visited_urls.join("\n")
    )
}
