use crate::domain::models::{Item, SourceKind};
use crate::domain::window::{CompletionFilter, Window};
use std::cmp::Ordering;

/// Concatenates per-source results in fetch order, keeps what `window` and
/// `predicate` admit, then sorts stably.
/// Ascending windows sort by relevant instant with undated items last.
/// The completed window sorts by `completed_at`, most recent first.
pub fn merge<F>(per_source: Vec<Vec<Item>>, window: &Window, predicate: F) -> Vec<Item>
where
    F: Fn(&Item) -> bool,
{
    let mut merged: Vec<Item> = per_source
        .into_iter()
        .flatten()
        .filter(|item| admits(window, item) && predicate(item))
        .collect();

    match window.completion {
        CompletionFilter::Incomplete => merged.sort_by(ascending_by_instant),
        CompletionFilter::Completed => merged.sort_by(most_recently_completed_first),
    }
    merged
}

fn admits(window: &Window, item: &Item) -> bool {
    let completion_ok = match (window.completion, item.kind) {
        (CompletionFilter::Completed, _) => item.is_completed,
        (CompletionFilter::Incomplete, SourceKind::Task) => !item.is_completed,
        (CompletionFilter::Incomplete, SourceKind::Event) => true,
    };
    completion_ok && window.contains(item.relevant_instant())
}

fn ascending_by_instant(left: &Item, right: &Item) -> Ordering {
    match (left.relevant_instant(), right.relevant_instant()) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn most_recently_completed_first(left: &Item, right: &Item) -> Ordering {
    match (left.completed_at, right.completed_at) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgendaSections {
    pub events: Vec<Item>,
    pub tasks: Vec<Item>,
}

impl AgendaSections {
    pub fn build(
        event_results: Vec<Vec<Item>>,
        task_results: Vec<Vec<Item>>,
        window: &Window,
    ) -> Self {
        Self {
            events: merge(event_results, window, |item| item.kind == SourceKind::Event),
            tasks: merge(task_results, window, |item| item.kind == SourceKind::Task),
        }
    }

    pub fn total_count(&self) -> usize {
        self.events.len() + self.tasks.len()
    }
}
