use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use assistdesk_core::api::v1::{
    self, ApiState, AssistantEditInput, AssistantEditOp, LlmResolveInput, SearchSummaryInput,
};
use assistdesk_core::backend::HttpBackend;
use assistdesk_core::config::{self, BackendSettingsUpdate};
use assistdesk_core::db::init_db;
use assistdesk_core::llm::SessionOverride;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn workspace_dir() -> PathBuf {
    if let Some(proj) = ProjectDirs::from("com", "AssistDesk", "AssistDesk") {
        proj.data_dir().to_path_buf()
    } else {
        std::env::temp_dir().join("AssistDesk")
    }
}

#[derive(Parser)]
#[command(name = "assistdesk", version, about = "Assistant and document-set administration")]
struct Cli {
    /// Directory holding the local database (defaults to the platform data dir).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Ping,
    DbStatus,
    /// Show or change the backend endpoint.
    Settings {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        timeout: Option<u64>,
    },
    Providers,
    /// Resolve the provider/model a chat turn would use.
    Resolve {
        #[arg(long)]
        persona: Option<i64>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
    },
    SupportsImages {
        provider: String,
        model: String,
    },
    /// Active and hidden assistants for the current user.
    Assistants,
    MoveUp {
        id: i64,
    },
    MoveDown {
        id: i64,
    },
    Add {
        id: i64,
    },
    Remove {
        id: i64,
    },
    /// Move an assistant into the slot currently held by `target`.
    Reorder {
        id: i64,
        target: i64,
    },
    /// Render the "Searching for" header, optionally applying an edit.
    SearchSummary {
        query: String,
        #[arg(long)]
        draft: Option<String>,
        #[arg(long)]
        editable: bool,
        #[arg(long)]
        has_docs: bool,
        #[arg(long)]
        showing_docs: bool,
    },
    DocumentSets {
        #[arg(long)]
        page: Option<usize>,
    },
    DeleteDocumentSet {
        id: i64,
    },
    Events {
        #[arg(long)]
        module: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = cli.workspace.clone().unwrap_or_else(workspace_dir);
    let db = init_db(dir.clone())
        .with_context(|| format!("failed to initialise database in {}", dir.display()))?;

    let settings = {
        let conn = db.get()?;
        config::effective_settings(&conn)?
    };
    tracing::debug!(base_url = %settings.base_url, "using backend");
    let backend = HttpBackend::new(&settings)?;
    let state = ApiState::new(db, Arc::new(backend));

    run(&state, cli.command).await
}

async fn run(state: &ApiState, command: Command) -> Result<()> {
    match command {
        Command::Ping => print(&v1::ping()),
        Command::DbStatus => print(&v1::db_status(state).map_err(|e| anyhow!(e))?),
        Command::Settings {
            url,
            token,
            timeout,
        } => {
            let snapshot = if url.is_none() && token.is_none() && timeout.is_none() {
                v1::settings_get(state).await
            } else {
                v1::settings_update(
                    state,
                    BackendSettingsUpdate {
                        base_url: url,
                        api_token: token,
                        timeout_secs: timeout,
                    },
                )
                .await
            };
            print(&snapshot.map_err(|e| anyhow!(e))?)
        }
        Command::Providers => print(&v1::llm_list_providers(state).await.map_err(|e| anyhow!(e))?),
        Command::Resolve {
            persona,
            provider,
            model,
            temperature,
        } => {
            let session = (provider.is_some() || model.is_some()).then_some(SessionOverride {
                provider,
                model_name: model,
            });
            let input = LlmResolveInput {
                persona_id: persona,
                session,
                temperature,
            };
            print(&v1::llm_resolve(state, input).await.map_err(|e| anyhow!(e))?)
        }
        Command::SupportsImages { provider, model } => {
            print(&v1::llm_supports_images(&provider, &model))
        }
        Command::Assistants => print(&v1::assistants_view(state).await.map_err(|e| anyhow!(e))?),
        Command::MoveUp { id } => edit(state, AssistantEditOp::MoveUp, id, None).await,
        Command::MoveDown { id } => edit(state, AssistantEditOp::MoveDown, id, None).await,
        Command::Add { id } => edit(state, AssistantEditOp::Add, id, None).await,
        Command::Remove { id } => edit(state, AssistantEditOp::Remove, id, None).await,
        Command::Reorder { id, target } => {
            edit(state, AssistantEditOp::Reorder, id, Some(target)).await
        }
        Command::SearchSummary {
            query,
            draft,
            editable,
            has_docs,
            showing_docs,
        } => print(&v1::search_summary_edit(SearchSummaryInput {
            query,
            draft,
            editable,
            has_docs,
            showing_docs,
        })),
        Command::DocumentSets { page } => print(
            &v1::document_sets_table(state, page)
                .await
                .map_err(|e| anyhow!(e))?,
        ),
        Command::DeleteDocumentSet { id } => print(
            &v1::document_set_delete(state, id)
                .await
                .map_err(|e| anyhow!(e))?,
        ),
        Command::Events { module, limit } => print(
            &v1::list_events(state, module, Some(limit)).map_err(|e| anyhow!(e))?,
        ),
    }
}

async fn edit(state: &ApiState, op: AssistantEditOp, id: i64, target: Option<i64>) -> Result<()> {
    let outcome = v1::assistants_edit(state, AssistantEditInput { op, id, target })
        .await
        .map_err(|e| anyhow!(e))?;
    if outcome.notice.is_success() {
        tracing::info!("{}", outcome.notice.message);
    } else {
        tracing::warn!("{}", outcome.notice.message);
    }
    print(&outcome)
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
