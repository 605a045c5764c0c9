use anyhow::Context;
use quorum::cli::init::{self, InitConfig, InitResult};
use quorum::cli::output::Output;
use quorum::cli::{Cli, Commands};
use quorum::types::OrchestrateRequest;
use quorum::utils::toml_config::{ConfigError, QuorumConfig, ServerConfig};
use quorum::{AppState, OrchestrationService};
use std::path::Path;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Some(Commands::Init {
        path,
        force,
        minimal,
        host,
        port,
    }) = cli.command
    {
        let config = InitConfig {
            path,
            force,
            minimal,
            host,
            port,
        };
        return match init::run(config, &output) {
            InitResult::Error(e) => anyhow::bail!("init failed: {}", e),
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
        };
    }

    let config = load_config(&cli.config, &output)?;
    init_tracing(&config.server, cli.verbose);

    match cli.command {
        None | Some(Commands::Serve) => serve(config, &output).await,
        Some(Commands::Ask {
            query,
            capabilities,
            mode,
            deadline_ms,
            context,
            json,
        }) => {
            let service = OrchestrationService::from_config(&config);
            let raw = OrchestrateRequest {
                query,
                capabilities: (!capabilities.is_empty()).then_some(capabilities),
                mode,
                context,
                deadline_ms,
            };
            let response = service.handle(raw).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                output.response(&response);
            }
            Ok(())
        }
        Some(Commands::Providers { check }) => {
            let service = OrchestrationService::from_config(&config);
            output.providers(&service.provider_summaries());

            let registry = service.registry();
            output.subheader("Candidate order by capability");
            for capability in registry.capabilities() {
                let chain: Vec<&str> = registry
                    .list_by_capability(capability)
                    .iter()
                    .map(|p| p.id.as_str())
                    .collect();
                output.kv(capability.as_str(), &chain.join(" > "));
            }

            if check {
                output.checks(&service.check_providers().await);
            }
            Ok(())
        }
        Some(Commands::Config { validate }) => {
            show_config(&cli.config, &config, validate, &output)
        }
        Some(Commands::Init { .. }) => Ok(()),
    }
}

fn load_config(path: &Path, output: &Output) -> anyhow::Result<QuorumConfig> {
    match QuorumConfig::load(path) {
        Ok(config) => Ok(config),
        Err(e @ ConfigError::FileNotFound(_)) => {
            output.error(&e.to_string());
            output.hint("Create one with: quorum-server init --minimal");
            Err(e.into())
        }
        Err(e) => {
            output.error(&e.to_string());
            Err(e.into())
        }
    }
}

fn init_tracing(server: &ServerConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "quorum={level},quorum_server={level},tower_http=info"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if server.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn serve(config: QuorumConfig, output: &Output) -> anyhow::Result<()> {
    output.banner();

    for warning in config.validate_with_warnings()? {
        tracing::warn!(kind = ?warning.kind, "{}", warning);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(&config);
    tracing::info!(
        providers = state.service.registry().len(),
        capabilities = ?state.service.registry().capabilities(),
        "Provider registry loaded"
    );

    let app = quorum::api::app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(%addr, "Quorum listening");
    output.info(&format!("Listening on http://{}", addr));

    axum::serve(listener, app).await?;
    Ok(())
}

fn show_config(
    path: &Path,
    config: &QuorumConfig,
    validate: bool,
    output: &Output,
) -> anyhow::Result<()> {
    output.header("Configuration");
    output.kv("file", &path.display().to_string());
    output.kv(
        "server",
        &format!("{}:{}", config.server.host, config.server.port),
    );
    output.kv(
        "deadline",
        &format!(
            "{} ms default, {} ms max",
            config.orchestration.default_deadline_ms, config.orchestration.max_deadline_ms
        ),
    );
    output.kv(
        "max concurrency",
        &config.orchestration.max_concurrency.to_string(),
    );

    let mut ids: Vec<&String> = config.providers.keys().collect();
    ids.sort();
    output.subheader(&format!("Providers ({})", ids.len()));
    for id in ids {
        if let Some(provider) = config.get_provider(id) {
            output.list_item(&format!(
                "{} ({}, priority {})",
                id,
                provider.backend.family(),
                provider.priority
            ));
        }
    }

    if validate {
        output.subheader("Validation");
        let warnings = config.validate_with_warnings()?;
        if warnings.is_empty() {
            output.success("Configuration is valid");
        } else {
            for warning in &warnings {
                output.warning(&warning.to_string());
            }
            output.success(&format!(
                "Configuration is valid with {} warning(s)",
                warnings.len()
            ));
        }
    }

    Ok(())
}
