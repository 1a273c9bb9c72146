use agenda_core::domain::merge::merge;
use agenda_core::domain::window::Window;
use agenda_core::infrastructure::badge_sink::RecordingBadgeSink;
use agenda_core::infrastructure::item_provider::InMemoryItemProvider;
use agenda_core::infrastructure::settings_store::InMemorySettingsStore;
use agenda_core::infrastructure::timer::ImmediateTimer;
use agenda_core::{
    open_workspace, AgendaOptions, AgendaService, Item, Source, SourceKind, ToggleOutcome,
    ViewKind,
};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type MemoryService =
    AgendaService<InMemoryItemProvider, InMemorySettingsStore, RecordingBadgeSink, ImmediateTimer>;

static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

struct TempWorkspace {
    path: PathBuf,
}

impl TempWorkspace {
    fn new() -> Self {
        let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "agenda-e2e-tests-{}-{}",
            std::process::id(),
            sequence
        ));
        Self { path }
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

fn fixed_time(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("valid datetime")
        .with_timezone(&Utc)
}

fn task_source(id: &str) -> Source {
    Source {
        id: id.to_string(),
        title: id.to_uppercase(),
        color: "#ff3b30".to_string(),
        kind: SourceKind::Task,
    }
}

fn due(id: &str, source_id: &str, at: &str) -> Item {
    Item::task(id, id, source_id, Some(fixed_time(at)))
}

fn memory_service(
    sources: Vec<Source>,
    items: Vec<Item>,
) -> (Arc<InMemoryItemProvider>, Arc<RecordingBadgeSink>, MemoryService) {
    let provider = Arc::new(InMemoryItemProvider::new(sources, items));
    let sink = Arc::new(RecordingBadgeSink::default());
    let service = AgendaService::new(
        Arc::clone(&provider),
        Arc::new(InMemorySettingsStore::default()),
        Arc::clone(&sink),
        Arc::new(ImmediateTimer),
        AgendaOptions::default().with_now_provider(Arc::new(|| fixed_time("2026-02-16T06:30:00Z"))),
    );
    (provider, sink, service)
}

fn ids(items: &[Item]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

#[tokio::test]
async fn hidden_source_is_excluded_from_today_and_badge() {
    let (_, sink, service) = memory_service(
        vec![task_source("a"), task_source("b")],
        vec![
            due("a-item", "a", "2026-02-16T09:00:00Z"),
            due("b-item", "b", "2026-02-16T08:00:00Z"),
        ],
    );
    service
        .set_source_hidden(SourceKind::Task, "b", true)
        .await
        .expect("hide b");

    let today = service.fetch_view(&ViewKind::Today).await.expect("fetch today");
    assert_eq!(ids(&today.tasks), vec!["a-item"]);
    assert_eq!(service.recompute_badge().await.expect("badge"), 1);
    assert_eq!(sink.last(), Some(1));
}

#[tokio::test]
async fn identical_instants_keep_fetch_order() {
    let at = "2026-02-16T09:00:00Z";
    let (_, _, service) = memory_service(
        vec![task_source("first"), task_source("second")],
        vec![due("x", "first", at), due("y", "second", at)],
    );

    let today = service.fetch_view(&ViewKind::Today).await.expect("fetch today");
    assert_eq!(ids(&today.tasks), vec!["x", "y"]);

    let direct = merge(
        vec![vec![due("x", "first", at)], vec![due("y", "second", at)]],
        &Window::unbounded(),
        |_| true,
    );
    assert_eq!(ids(&direct), vec!["x", "y"]);
}

#[tokio::test]
async fn stored_manual_order_projects_with_newcomers_at_tail() {
    let (_, _, service) = memory_service(
        vec![task_source("list")],
        vec![
            due("x", "list", "2026-02-16T08:00:00Z"),
            due("y", "list", "2026-02-16T09:00:00Z"),
            due("z", "list", "2026-02-16T10:00:00Z"),
        ],
    );
    service
        .preferences()
        .replace_manual_order("next", &["z".to_string(), "x".to_string()])
        .expect("store order");

    let next = service.fetch_view(&ViewKind::Next).await.expect("fetch next");
    assert_eq!(ids(&next.tasks), vec!["z", "x", "y"]);
}

#[tokio::test]
async fn toggling_through_the_service_updates_views_and_badge() {
    let (provider, sink, service) = memory_service(
        vec![task_source("list")],
        vec![
            due("x", "list", "2026-02-16T08:00:00Z"),
            due("y", "list", "2026-02-16T09:00:00Z"),
        ],
    );
    service.fetch_view(&ViewKind::Today).await.expect("fetch today");

    let outcome = service.toggle(&ViewKind::Today, "x").await.expect("toggle x");
    assert!(matches!(outcome, ToggleOutcome::Committed(_)));
    assert_eq!(sink.last(), Some(1));

    let completed = service.fetch_view(&ViewKind::Completed).await.expect("fetch completed");
    assert_eq!(ids(&completed.tasks), vec!["x"]);

    let undo = service
        .toggle(&ViewKind::Completed, "x")
        .await
        .expect("toggle back");
    assert!(matches!(undo, ToggleOutcome::Committed(ref item) if !item.is_completed));
    assert!(!provider.item("x").expect("read").expect("exists").is_completed);
    assert_eq!(sink.last(), Some(2));
}

#[tokio::test]
async fn workspace_settings_survive_a_new_service() {
    let workspace = TempWorkspace::new();
    let sources = vec![task_source("a"), task_source("b")];
    let items = vec![
        due("a-item", "a", "2026-02-16T09:00:00Z"),
        due("b-item", "b", "2026-02-16T08:00:00Z"),
    ];

    let (bootstrap, first) = open_workspace(
        &workspace.path,
        Arc::new(InMemoryItemProvider::new(sources.clone(), items.clone())),
        Arc::new(RecordingBadgeSink::default()),
    )
    .expect("open workspace");
    assert!(bootstrap.database_path.exists());
    first
        .set_source_hidden(SourceKind::Task, "b", true)
        .await
        .expect("hide b");

    let (_, second) = open_workspace(
        &workspace.path,
        Arc::new(InMemoryItemProvider::new(sources, items)),
        Arc::new(RecordingBadgeSink::default()),
    )
    .expect("reopen workspace");
    let visible = second
        .visible_sources(SourceKind::Task)
        .await
        .expect("visible sources");
    assert_eq!(
        visible.iter().map(|source| source.id.as_str()).collect::<Vec<_>>(),
        vec!["a"]
    );
}
