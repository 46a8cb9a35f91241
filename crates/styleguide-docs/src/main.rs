mod cache;
mod check;
mod cli;
mod config;
mod corpus;
mod error;
mod frontmatter;
mod locale;
mod model;
mod parser;
mod search;
mod server;
mod traversal;
mod update;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cache::DocsCache;
use check::CheckReport;
use cli::{CheckArgs, Cli, Command, ListArgs};
use config::Config;
use corpus::Corpus;
use server::StyleguideDocsServer;
use traversal::ContentTree;
use update::UpdateService;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // stdout carries MCP JSON-RPC and check reports; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Check(args) => run_check(args).await,
        Command::List(args) => run_list(args).await,
        Command::Serve => {
            serve().await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_check(args: CheckArgs) -> anyhow::Result<ExitCode> {
    let layout = config::layout_from_env(args.root.as_deref())?;
    info!(
        root = %layout.root.display(),
        default_locale = %layout.default_locale,
        locales = ?layout.locales,
        "checking content tree"
    );

    let corpus =
        tokio::task::spawn_blocking(move || Corpus::load(&ContentTree::new(layout))).await?;
    let report = CheckReport::from_corpus(&corpus);

    report.write_to(&mut std::io::stdout().lock(), args.json)?;

    let passed = report.passed(args.strict);
    info!(
        passed,
        documents = report.document_count,
        malformed = report.malformed.len(),
        io_failures = report.io_failures.len(),
        coverage_problems = report.coverage.problem_count(),
        "check finished"
    );
    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Streams descriptors to stdout as JSON lines; failures are logged and
/// counted but do not stop the walk.
async fn run_list(args: ListArgs) -> anyhow::Result<ExitCode> {
    let layout = config::layout_from_env(args.root.as_deref())?;
    let summary = tokio::task::spawn_blocking(move || {
        check::write_descriptors(&ContentTree::new(layout), &mut std::io::stdout().lock())
    })
    .await??;

    info!(
        written = summary.written,
        failures = summary.failures,
        closed_early = summary.closed_early,
        "list finished"
    );
    Ok(if summary.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn serve() -> anyhow::Result<()> {
    info!("starting styleguide-docs MCP server");

    let config = Config::from_env()?;
    info!(
        content_root = %config.layout.root.display(),
        lancedb_path = %config.lancedb_path,
        redis = config.redis_url.is_some(),
        "configuration loaded"
    );

    let redis_cache = docs_common::redis::RedisCache::new(config.redis_url.as_deref());
    if redis_cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without cache");
    }
    let cache = Arc::new(DocsCache::new(redis_cache));

    info!("initializing embedding model (may download on first run)");
    let embedder = Arc::new(docs_common::embedding::Embedder::new().await?);
    info!("embedding model ready");

    let vectordb =
        Arc::new(docs_common::vectordb::VectorDb::connect(&config.lancedb_path).await?);
    info!("lancedb connected");

    let update_service = UpdateService::new(
        config.clone(),
        Arc::clone(&embedder),
        Arc::clone(&vectordb),
        Arc::clone(&cache),
    );

    let corpus = update_service.load_corpus().await?;
    if update_service.needs_update(&corpus).await? {
        info!("indexing documents (first run or content changed)");
        let digest = update_service.reindex(&corpus).await?;
        info!(
            digest = %digest,
            documents = corpus.documents.len(),
            topics = corpus.topics.len(),
            "indexing complete"
        );
    } else {
        info!(documents = corpus.documents.len(), "index up to date");
    }

    let server = StyleguideDocsServer::new(corpus, embedder, vectordb, cache, config);

    if let Ok(addr) = std::env::var("MCP_HTTP_LISTEN_ADDR") {
        let service = StreamableHttpService::new(
            move || Ok(server.clone()),
            LocalSessionManager::default().into(),
            Default::default(),
        );
        let router = axum::Router::new().nest_service("/mcp", service);
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving streamable HTTP on /mcp");
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
        info!("MCP server shut down");
    } else if let Ok(addr) = std::env::var("MCP_TCP_LISTEN_ADDR") {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
