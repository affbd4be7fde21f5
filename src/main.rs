use clap::Parser;
use qa_stream::config::{self, AppConfig, ConfigOverrides};
use qa_stream::error::ServiceError;
use qa_stream::llm::ProviderClient;
use qa_stream::logging::{init_logging, LogLevel};
use qa_stream::qa::QueryOrchestrator;
use qa_stream::server::{self, AppState};
use qa_stream::storage::SqlStore;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "qa-stream", version, about = "Question answering over streamed LLM responses")]
struct Cli {
    /// Configuration file (defaults to ./qa-stream.toml, then the XDG config dir)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// TCP port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Database file, or `:memory:`
    #[arg(long, env = "DB_PATH")]
    db_path: Option<String>,

    /// LLM vendor (openai, bella, gemini, qwen, wenxin, mock)
    #[arg(long, env = "LLM_PROVIDER")]
    provider: Option<String>,

    /// API key for the LLM vendor (LLM_API_KEY is read when nothing else is set)
    #[arg(long)]
    api_key: Option<String>,

    /// Endpoint override for the LLM vendor
    #[arg(long, env = "LLM_API_URL")]
    api_url: Option<String>,

    /// Model override for the LLM vendor
    #[arg(long, env = "LLM_MODEL")]
    model: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// Trusted header carrying the caller's user id
    #[arg(long, env = "QA_USER_HEADER")]
    user_header: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            db_path: self.db_path.clone(),
            provider: self.provider.clone(),
            api_key: self.api_key.clone(),
            api_url: self.api_url.clone(),
            model: self.model.clone(),
            log_level: self.log_level,
            user_header: self.user_header.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config.with_overrides(cli.overrides()),
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("warning: {}", e);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "qa-stream stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), ServiceError> {
    config.validate()?;
    let addr = config.server.socket_addr()?;

    let store = SqlStore::open(&config.storage).await?;
    info!(path = %config.storage.db_path, "record store opened");

    let client = ProviderClient::new(config.llm.to_provider_config());
    if let Err(e) = client.check_connection().await {
        warn!(provider = client.provider_name(), error = %e, "LLM provider check failed; continuing");
    } else {
        info!(provider = client.provider_name(), "LLM provider reachable");
    }

    let orchestrator = QueryOrchestrator::new(Arc::new(store), Arc::new(client));
    let mut state = AppState::new(orchestrator);
    if let Some(ref header) = config.identity.user_header {
        state = state.with_user_header(header)?;
    }

    server::serve(addr, state).await?;
    info!("server stopped");
    Ok(())
}
