//! Application state wiring all services together.
//!
//! AppState holds the concrete collaborators used by both the CLI and the
//! interview server. Session logic is generic over the core ports; the
//! aliases below pin it to the infra implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use examiner_core::interview::session::{InterviewSession, SessionServices, SessionSettings};
use examiner_core::llm::gateway::{GatewaySettings, LlmGateway};
use examiner_infra::config::{api_key_from_env, load_global_config};
use examiner_infra::filesystem::{resolve_data_dir, resolve_in_data_dir};
use examiner_infra::prompt::file::FilePromptTemplate;
use examiner_infra::sqlite::pool::{DatabasePool, database_url};
use examiner_infra::sqlite::quota::SqliteQuotaRepository;
use examiner_infra::sqlite::token::SqliteAccessTokenRepository;
use examiner_types::config::GlobalConfig;
use examiner_types::identity::UserIdentity;

use crate::http::handlers::ws::WsSink;

/// Session collaborators pinned to the infra implementations.
pub type ConcreteServices = SessionServices<SqliteQuotaRepository, FilePromptTemplate>;

/// An interview session over an axum WebSocket.
pub type ConcreteSession = InterviewSession<WsSink, SqliteQuotaRepository, FilePromptTemplate>;

/// Registry entry for a live interview.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub identity: UserIdentity,
    pub started_at: DateTime<Utc>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: Arc<GlobalConfig>,
    pub gateway: Arc<LlmGateway>,
    pub quotas: Arc<SqliteQuotaRepository>,
    pub tokens: Arc<SqliteAccessTokenRepository>,
    pub prompts: Arc<FilePromptTemplate>,
    pub session_settings: SessionSettings,
    /// Live interviews by session id.
    pub sessions: Arc<DashMap<Uuid, SessionEntry>>,
    /// Parent of every session's cancellation token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Initialize the application state from the resolved data directory.
    ///
    /// The LLM gateway starts not ready; call [`AppState::start_gateway`]
    /// before serving interviews.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_global_config(&data_dir).await;
        Self::with_config(&data_dir, config).await
    }

    /// Build the state for `data_dir` with an already loaded configuration.
    pub async fn with_config(data_dir: &Path, config: GlobalConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;

        let db_pool = DatabasePool::new(&database_url(data_dir)).await?;
        let gateway = LlmGateway::new(GatewaySettings::from(&config.llm));
        let prompts = FilePromptTemplate::new(resolve_in_data_dir(
            data_dir,
            &config.interview.prompt_template_path,
        ));
        let session_settings = SessionSettings::from_config(&config.interview, &config.llm);

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            gateway: Arc::new(gateway),
            quotas: Arc::new(SqliteQuotaRepository::new(db_pool.clone())),
            tokens: Arc::new(SqliteAccessTokenRepository::new(db_pool)),
            prompts: Arc::new(prompts),
            session_settings,
            config: Arc::new(config),
            sessions: Arc::new(DashMap::new()),
            shutdown: CancellationToken::new(),
        })
    }

    /// Build, probe and install the chat-completion provider.
    pub async fn start_gateway(&self) {
        examiner_infra::llm::init_gateway(&self.gateway, &self.config.llm, api_key_from_env())
            .await;
    }

    pub fn session_services(&self) -> ConcreteServices {
        SessionServices {
            gateway: Arc::clone(&self.gateway),
            quotas: Arc::clone(&self.quotas),
            prompts: Arc::clone(&self.prompts),
        }
    }
}
