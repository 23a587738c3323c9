//! CLI entrypoint for conductor
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use conductor_application::{
    AgentContext, DocumentReader, EmbeddingPort, NoProgress, Orchestrator, OrchestratorProgress,
    RetrievalCache,
};
use conductor_domain::prompt::DEFAULT_SYSTEM_PROMPT;
use conductor_domain::retrieval::TextSplitter;
use conductor_domain::{Conversation, ConversationId, Message, Severity};
use conductor_infrastructure::config::{EmbeddingKind, FileConfig, FileEmbeddingConfig};
use conductor_infrastructure::{
    ConfigLoader, DeploymentTool, DocumentSearchTool, FileContentTool, HashingEmbedder,
    HttpDeploymentClient, HttpEmbeddingClient, HttpModelGateway, HttpTransport,
    JsonlConversationLogger, ProtocolClient, TextExtractor, ToolAdapter, ToolRegistry,
};
use conductor_presentation::{
    ChatRepl, Cli, ConsoleFormatter, ProgressReporter, SimpleProgress, compose_user_message,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    let _log_guard = init_logging(cli.verbose, config.logging.file.as_deref())?;
    report_config_issues(&config)?;

    if !config.output.color {
        colored::control::set_override(false);
    }

    info!("Starting conductor");

    // === Dependency Injection ===
    let shutdown = CancellationToken::new();

    // Model gateway
    let gateway = Arc::new(
        HttpModelGateway::new(
            &config.model.url,
            &config.model.model,
            config.model.resolve_api_key(),
            Duration::from_secs(config.model.timeout_secs),
        )?
        .with_temperature(config.model.temperature),
    );

    // Retrieval cache (one index per conversation)
    let retrieval = config.retrieval.to_retrieval_params();
    let embedder = build_embedder(&config.retrieval.embedding)?;
    let cache = Arc::new(RetrievalCache::new(embedder, retrieval.idle_ttl));
    let sweeper = cache.spawn_sweeper(retrieval.sweep_interval, shutdown.clone());

    // Document tools
    let extractor = TextExtractor::new(Duration::from_secs(config.extraction.timeout_secs))?
        .with_allowed_roots(document_roots(&config, &cli.files)?);
    let reader = Arc::new(DocumentReader::new(
        Arc::new(extractor),
        Arc::clone(&cache),
        config.extraction.to_policy(),
        TextSplitter::new(retrieval.chunk_size, retrieval.chunk_overlap),
        retrieval.top_k,
    ));

    // Tool registry: local, then deployment, then remote
    let (registry, servers) = build_registry(&config, reader).await?;
    info!(tools = ?registry.names(), stats = ?registry.stats(), "Tool registry ready");

    // Orchestrator
    let mut params = config.orchestrator.to_execution_params();
    if let Some(max_depth) = cli.max_depth {
        params = params.with_max_depth(max_depth);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut orchestrator = Orchestrator::new(
        gateway,
        AgentContext::new(Arc::new(registry), Arc::clone(&cache)),
        params,
    )
    .with_progress(progress_for(cli.quiet || !config.output.progress))
    .with_cancellation(cancel);

    if let Some(path) = &config.logging.conversation_log
        && let Some(logger) = JsonlConversationLogger::new(path)
    {
        info!(path = %logger.path().display(), "Logging conversation events");
        orchestrator = orchestrator.with_logger(Arc::new(logger));
    }

    let formatter = ConsoleFormatter::new(config.output.resolve_format(cli.output.map(Into::into)));

    let system_prompt = config
        .orchestrator
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let mut conversation = Conversation::with_system_prompt(
        ConversationId::new(uuid::Uuid::new_v4().to_string()),
        system_prompt,
    );

    // === Run ===
    let result = if cli.chat {
        let mut repl = ChatRepl::new(orchestrator, conversation, formatter).with_files(cli.files);
        repl.run().await.context("Chat session failed")
    } else {
        match cli.question {
            Some(question) => {
                conversation.push(Message::user(compose_user_message(&question, &cli.files)))?;
                let outcome = orchestrator.run(&mut conversation).await;
                orchestrator.close_conversation(conversation.id());

                match outcome {
                    Ok(outcome) => {
                        println!("{}", formatter.format(&outcome));
                        Ok(())
                    }
                    Err(e) => {
                        eprintln!("{}", formatter.format_error(&e.to_string()));
                        Err(e.into())
                    }
                }
            }
            None => Err(anyhow!(
                "Question is required. Use --chat for interactive mode."
            )),
        }
    };

    // === Shutdown ===
    for server in &servers {
        server.close().await;
    }
    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Retrieval sweeper did not stop cleanly");
    }

    result
}

/// Install the tracing subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8, file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let Some(path) = file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("Invalid log file path: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();
    Ok(Some(guard))
}

/// Log every configuration issue; abort if any is an error.
fn report_config_issues(config: &FileConfig) -> Result<()> {
    let issues = config.validate();
    let mut errors = 0;

    for issue in &issues {
        match issue.severity {
            Severity::Error => {
                error!("config: {}", issue.message);
                errors += 1;
            }
            Severity::Warning => warn!("config: {}", issue.message),
        }
    }

    if errors > 0 {
        bail!("Configuration has {} error(s); see log output above", errors);
    }
    Ok(())
}

/// Where local documents may be read from: the working directory, the
/// configured roots and every local file attached on the command line.
fn document_roots(config: &FileConfig, files: &[String]) -> Result<Vec<PathBuf>> {
    let mut roots = vec![std::env::current_dir().context("Failed to resolve working directory")?];
    roots.extend(config.extraction.allowed_roots.iter().cloned());
    roots.extend(
        files
            .iter()
            .filter(|f| !f.starts_with("http://") && !f.starts_with("https://"))
            .map(|f| PathBuf::from(f.strip_prefix("file://").unwrap_or(f))),
    );
    Ok(roots)
}

fn build_embedder(config: &FileEmbeddingConfig) -> Result<Arc<dyn EmbeddingPort>> {
    let (kind, _) = config.parse_kind();
    let embedder: Arc<dyn EmbeddingPort> = match kind {
        EmbeddingKind::Hashing => Arc::new(HashingEmbedder::new(config.dimension)),
        EmbeddingKind::Http => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| anyhow!("[retrieval.embedding] requires a url"))?;
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
            Arc::new(HttpEmbeddingClient::new(
                url,
                model,
                config.resolve_api_key(),
                config.dimension,
                Duration::from_secs(config.timeout_secs),
            )?)
        }
    };
    Ok(embedder)
}

/// Register every configured tool. Returns the registry and the remote
/// server clients so they can be closed on exit.
async fn build_registry(
    config: &FileConfig,
    reader: Arc<DocumentReader>,
) -> Result<(ToolRegistry, Vec<Arc<ProtocolClient>>)> {
    let mut registry = ToolRegistry::new();

    registry.register(ToolAdapter::local(FileContentTool::new(Arc::clone(&reader))));
    registry.register(ToolAdapter::local(DocumentSearchTool::new(reader)));

    let image = &config.tools.image;
    if image.enabled {
        let client = HttpDeploymentClient::new(
            &image.name,
            &image.url,
            image.resolve_api_key(),
            Duration::from_secs(image.timeout_secs),
        )?;
        registry.register(ToolAdapter::Deployment(DeploymentTool::image_generation(
            &image.name,
            Arc::new(client),
        )));
    }

    let mut servers = Vec::new();
    for server in &config.tools.remote {
        let transport = HttpTransport::new(
            &server.url,
            &server.headers,
            Duration::from_secs(server.timeout_secs),
        )?;
        let client = Arc::new(
            ProtocolClient::new(&server.name, Arc::new(transport))
                .with_max_consecutive_failures(server.max_consecutive_failures),
        );

        // An unreachable server is skipped; the rest of the registry still works.
        if registry
            .register_remote(Arc::clone(&client), server.max_output_chars)
            .await
            .is_ok()
        {
            servers.push(client);
        }
    }

    Ok((registry, servers))
}

fn progress_for(quiet: bool) -> Arc<dyn OrchestratorProgress> {
    if quiet {
        Arc::new(NoProgress)
    } else if std::io::stderr().is_terminal() {
        Arc::new(ProgressReporter::new())
    } else {
        Arc::new(SimpleProgress)
    }
}
