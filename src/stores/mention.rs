/// Mention autocomplete
///
/// Detects a trailing `@token` before the cursor, debounces a remote
/// suggestion search, and splices the chosen handle back into the text.
/// Stale debounced responses are discarded by generation counting; nothing
/// is cached across keystrokes.
use crate::{
    backend::{decode_rows, DataPlane, Filter, Query, Table},
    config::MentionConfig,
    error::ClientResult,
    models::MentionCandidate,
};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

lazy_static! {
    /// Trailing mention token: `@` plus word characters ending at the cursor
    static ref MENTION_RE: Regex = Regex::new(r"@(\w*)$").unwrap();
}

/// A detected mention context
#[derive(Debug, Clone, PartialEq)]
pub struct MentionHit {
    /// Text typed after the `@`, possibly empty
    pub query: String,
    /// Byte offset of the `@` in the full text
    pub start: usize,
}

/// Detect a mention token ending at the cursor; a trailing space or missing
/// `@` yields `None`
pub fn detect_mention(text: &str, cursor: usize) -> Option<MentionHit> {
    let before_cursor = text.get(..cursor)?;
    let captures = MENTION_RE.captures(before_cursor)?;
    let query = captures.get(1)?.as_str().to_string();
    Some(MentionHit {
        start: cursor - query.len() - 1,
        query,
    })
}

/// Splice the chosen handle into the text at the mention's `@` offset.
/// Returns the new text and the cursor position after the handle and one
/// trailing space.
pub fn apply_selection(text: &str, hit: &MentionHit, username: &str) -> (String, usize) {
    let token_end = hit.start + 1 + hit.query.len();
    let mut result = String::with_capacity(text.len() + username.len() + 2);
    result.push_str(&text[..hit.start]);
    result.push('@');
    result.push_str(username);
    result.push(' ');
    let cursor = result.len();
    result.push_str(&text[token_end..]);
    (result, cursor)
}

#[derive(Default)]
struct MentionState {
    active: Option<MentionHit>,
    suggestions: Vec<MentionCandidate>,
    open: bool,
}

/// Debounced mention suggestion tracker
#[derive(Clone)]
pub struct MentionTracker {
    data: Arc<dyn DataPlane>,
    config: MentionConfig,
    generation: Arc<AtomicU64>,
    state: Arc<RwLock<MentionState>>,
}

impl MentionTracker {
    pub fn new(data: Arc<dyn DataPlane>, config: MentionConfig) -> Self {
        Self {
            data,
            config,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(RwLock::new(MentionState::default())),
        }
    }

    /// The mention context currently being completed
    pub fn active(&self) -> Option<MentionHit> {
        self.state.read().active.clone()
    }

    /// Current suggestions, at most `suggestion_limit`
    pub fn suggestions(&self) -> Vec<MentionCandidate> {
        self.state.read().suggestions.clone()
    }

    /// Whether the suggestion list should be shown
    pub fn is_open(&self) -> bool {
        self.state.read().open
    }

    /// Feed a keystroke: text plus the byte offset of the cursor.
    ///
    /// A detected token schedules a debounced remote search; anything else
    /// closes the suggestions and invalidates pending searches.
    pub fn on_input(&self, text: &str, cursor: usize) {
        match detect_mention(text, cursor) {
            Some(hit) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                self.state.write().active = Some(hit.clone());

                let tracker = self.clone();
                let debounce = Duration::from_millis(tracker.config.debounce_ms);
                tokio::spawn(async move {
                    tokio::time::sleep(debounce).await;
                    if tracker.generation.load(Ordering::SeqCst) != generation {
                        return; // superseded by a newer keystroke
                    }
                    tracker.run_search(hit.query, generation).await;
                });
            }
            None => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                *self.state.write() = MentionState::default();
            }
        }
    }

    async fn run_search(&self, query: String, generation: u64) {
        if query.is_empty() {
            let mut state = self.state.write();
            state.suggestions.clear();
            state.open = false;
            return;
        }

        match self.search_users(&query).await {
            Ok(candidates) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                let mut state = self.state.write();
                state.suggestions = candidates;
                state.open = true;
            }
            Err(e) => {
                error!("Error searching users: {}", e);
                let mut state = self.state.write();
                state.suggestions.clear();
            }
        }
    }

    /// Fresh remote search over handle and display name, handles non-null
    pub async fn search_users(&self, query: &str) -> ClientResult<Vec<MentionCandidate>> {
        let rows = self
            .data
            .select(
                Table::Profiles,
                Query::new()
                    .any_of(vec![
                        Filter::contains("username", query),
                        Filter::contains("display_name", query),
                    ])
                    .filter(Filter::NotNull("username"))
                    .limit(self.config.suggestion_limit),
            )
            .await?;
        decode_rows(rows)
    }

    /// Complete the active mention with the chosen handle; returns the new
    /// text and cursor
    pub fn select(&self, text: &str, username: &str) -> Option<(String, usize)> {
        let hit = {
            let mut state = self.state.write();
            let hit = state.active.take()?;
            state.suggestions.clear();
            state.open = false;
            hit
        };
        self.generation.fetch_add(1, Ordering::SeqCst);
        Some(apply_selection(text, &hit, username))
    }

    /// Dismiss the suggestion list
    pub fn close(&self) {
        let mut state = self.state.write();
        state.suggestions.clear();
        state.open = false;
    }
}
