pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::completion::ToggleOutcome;
pub use application::views::{
    AgendaOptions, AgendaService, SourceVisibility, ViewKind, ViewSnapshot,
};
pub use domain::models::{Item, NewTask, Source, SourceKind};
pub use infrastructure::error::AgendaError;

use infrastructure::badge_sink::BadgeSink;
use infrastructure::item_provider::ItemProvider;
use infrastructure::logging::init_logging;
use infrastructure::settings_store::SqliteSettingsStore;
use infrastructure::timer::TokioTimer;
use std::path::Path;
use std::sync::Arc;

pub type WorkspaceAgendaService<P, B> = AgendaService<P, SqliteSettingsStore, B, TokioTimer>;

pub fn open_workspace<P, B>(
    workspace_root: &Path,
    provider: Arc<P>,
    badge_sink: Arc<B>,
) -> Result<(BootstrapResult, WorkspaceAgendaService<P, B>), AgendaError>
where
    P: ItemProvider + 'static,
    B: BadgeSink,
{
    let bootstrap = bootstrap_workspace(workspace_root)?;
    if let Err(error) = init_logging(&bootstrap.logs_dir, bootstrap.config.log_level()?) {
        log::warn!("keeping existing logger: {error}");
    }

    let options = AgendaOptions::from_config(&bootstrap.config)?;
    let service = AgendaService::new(
        provider,
        Arc::new(SqliteSettingsStore::new(&bootstrap.database_path)),
        badge_sink,
        Arc::new(TokioTimer),
        options,
    );
    log::info!(
        "agenda workspace ready at {}",
        bootstrap.workspace_root.display()
    );
    Ok((bootstrap, service))
}
