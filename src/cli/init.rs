//! Init command implementation
//!
//! Scaffolds a `quorum.toml` and `.env.example` for a new deployment.

use super::output::Output;
use std::fs;
use std::path::Path;

/// Result of the init operation
#[derive(Debug, PartialEq)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// quorum.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: std::path::PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Only scripted local providers, no API keys needed
    pub minimal: bool,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Quorum");

    let base_path = &config.path;
    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
    }

    let config_path = base_path.join("quorum.toml");
    if config_path.exists() && !config.force {
        output.warning("quorum.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    output.subheader("Creating configuration files");

    let toml_content = generate_quorum_toml(&config);
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.error(&format!("Failed to create quorum.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "quorum.toml");

    if !config.minimal {
        let env_example_path = base_path.join(".env.example");
        if let Err(e) = write_file(&env_example_path, generate_env_example(), config.force) {
            output.error(&format!("Failed to create .env.example: {}", e));
            return InitResult::Error(e.to_string());
        }
        output.created("env", ".env.example");
    }

    output.complete("Quorum initialized successfully!");

    output.header("Next Steps");
    output.newline();
    if config.minimal {
        output.info("The scripted providers answer locally; no API keys are needed.");
    } else {
        output.info("Set the API keys of the providers you want to use:");
        output.command("cp .env.example .env");
        output.info("Providers whose key is missing report UNAVAILABLE and are skipped.");
    }
    output.newline();
    output.info("Start the server:");
    output.command("quorum-server");
    output.info("Or ask a single question:");
    output.command("quorum-server ask \"Is Rust a good fit for this service?\" -c reasoning");
    output.newline();

    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_quorum_toml(config: &InitConfig) -> String {
    let providers = if config.minimal {
        MINIMAL_PROVIDERS
    } else {
        FULL_PROVIDERS
    };

    format!(
        r#"# Quorum configuration
#
# Providers are tried in ascending `priority` order (fallback mode) or all at
# once (fanout mode). Secrets are never stored here: `credential_env` names the
# environment variable that holds the key.

[server]
host = "{host}"
port = {port}
log_level = "info"
log_format = "pretty"   # or "json"

[orchestration]
default_deadline_ms = 30000
max_deadline_ms = 120000
max_concurrency = 16
max_query_chars = 8000
agreement_threshold = 0.3
check_timeout_ms = 5000
{providers}"#,
        host = config.host,
        port = config.port,
        providers = providers
    )
}

const MINIMAL_PROVIDERS: &str = r#"
[providers.scripted-primary]
type = "static"
display_name = "Scripted primary"
capabilities = ["reasoning", "summarization", "sentiment", "retrieval", "generation"]
priority = 1
reliability = 0.6

[providers.scripted-backup]
type = "static"
display_name = "Scripted backup"
capabilities = ["reasoning", "summarization", "sentiment", "retrieval", "generation"]
priority = 2
reliability = 0.4
delay_ms = 150
"#;

const FULL_PROVIDERS: &str = r#"
[providers.grok]
type = "openai"
display_name = "xAI Grok"
api_base = "https://api.x.ai/v1"
model = "grok-3-mini"
credential_env = "XAI_API_KEY"
capabilities = ["reasoning", "sentiment", "generation"]
priority = 1
reliability = 0.85
timeout_ms = 20000
rate_limit_per_minute = 60

[providers.claude]
type = "anthropic"
display_name = "Anthropic Claude"
model = "claude-3-5-haiku-latest"
credential_env = "ANTHROPIC_API_KEY"
capabilities = ["reasoning", "summarization", "generation"]
priority = 2
reliability = 0.9
timeout_ms = 20000

[providers.gemini]
type = "gemini"
display_name = "Google Gemini"
model = "gemini-2.0-flash"
credential_env = "GEMINI_API_KEY"
capabilities = ["summarization", "retrieval", "sentiment"]
priority = 3
reliability = 0.8
timeout_ms = 15000

[providers.mistral]
type = "openai"
display_name = "Mistral"
api_base = "https://api.mistral.ai/v1"
model = "mistral-small-latest"
credential_env = "MISTRAL_API_KEY"
capabilities = ["retrieval", "summarization"]
priority = 4
reliability = 0.75

[providers.command]
type = "cohere"
display_name = "Cohere Command"
model = "command-r-plus"
credential_env = "COHERE_API_KEY"
capabilities = ["retrieval", "summarization", "reasoning"]
priority = 5
reliability = 0.75

[providers.local]
type = "ollama"
display_name = "Local Ollama"
model = "llama3.2"
capabilities = ["reasoning", "summarization", "sentiment", "retrieval", "generation"]
priority = 10
reliability = 0.5
timeout_ms = 30000
"#;

fn generate_env_example() -> &'static str {
    r#"# Provider credentials (only the providers you use need a key)
XAI_API_KEY=
ANTHROPIC_API_KEY=
GEMINI_API_KEY=
MISTRAL_API_KEY=
COHERE_API_KEY=

# Logging
RUST_LOG=info,quorum=debug
"#
}
