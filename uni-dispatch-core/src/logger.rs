//! Action logging with pattern-based filtering and a shared in-memory history
//!
//! The middleware lives inside the container's state store, so the recorded
//! history is exposed through a cloneable [`ActionLogHandle`] that the host
//! keeps after handing the middleware to the builder.
//!
//! # Example
//!
//! ```ignore
//! use uni_dispatch_core::logger::{ActionLogConfig, ActionLoggerMiddleware};
//!
//! let middleware = ActionLoggerMiddleware::with_log(ActionLogConfig::default());
//! let history = middleware.log_handle().expect("storage enabled");
//!
//! let container = Container::builder(State::default())
//!     .with_reducer(reducer)
//!     .with_middleware(middleware)
//!     .start()?;
//!
//! for entry in history.recent(10) {
//!     println!("#{} {}", entry.sequence, entry.summary);
//! }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::action::ActionSummary;
use crate::store::Middleware;

/// Include/exclude filter over action names.
///
/// Patterns support `*` (any sequence) and `?` (one character):
/// - `Fetch*` matches FetchRandomArticle, FetchNext, ...
/// - `*Failed` matches ArticleFailed, ...
/// - `Tick` matches only Tick
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ActionLoggerConfig {
    /// If non-empty, only log actions matching one of these patterns
    pub include_patterns: Vec<String>,
    /// Never log actions matching these patterns (applied after include)
    pub exclude_patterns: Vec<String>,
}

impl Default for ActionLoggerConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: vec!["Tick".to_string()],
        }
    }
}

impl ActionLoggerConfig {
    /// Build a filter from comma-separated pattern lists.
    ///
    /// `None` for `exclude` keeps the default exclusion of `Tick`.
    ///
    /// ```
    /// use uni_dispatch_core::logger::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::new(Some("Fetch*, ArticleLoaded"), None);
    /// assert!(config.should_log("FetchRandomArticle"));
    /// assert!(config.should_log("ArticleLoaded"));
    /// assert!(!config.should_log("Tick"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        let defaults = Self::default();
        Self {
            include_patterns: include.map(split_patterns).unwrap_or_default(),
            exclude_patterns: exclude
                .map(split_patterns)
                .unwrap_or(defaults.exclude_patterns),
        }
    }

    /// Filter that lets every action through
    pub fn allow_all() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Check whether an action name passes the filter
    pub fn should_log(&self, action_name: &str) -> bool {
        if !self.include_patterns.is_empty()
            && !self
                .include_patterns
                .iter()
                .any(|p| glob_match(p, action_name))
        {
            return false;
        }

        !self
            .exclude_patterns
            .iter()
            .any(|p| glob_match(p, action_name))
    }
}

fn split_patterns(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// An entry in the action log
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    /// Action name (from `Action::name()`)
    pub name: &'static str,
    /// Debug summary of the action
    pub summary: String,
    /// When the action reached the reducer
    pub timestamp: Instant,
    /// Position in the linearized application order
    pub sequence: u64,
    /// Whether the reduce changed the state; `None` until the reducer ran
    pub state_changed: Option<bool>,
}

impl ActionLogEntry {
    fn new(name: &'static str, summary: String, sequence: u64) -> Self {
        Self {
            name,
            summary,
            timestamp: Instant::now(),
            sequence,
            state_changed: None,
        }
    }

    /// Format the elapsed time for display (e.g. "2.3s", "150ms")
    pub fn elapsed_display(&self) -> String {
        let elapsed = self.timestamp.elapsed();
        if elapsed.as_secs() >= 1 {
            format!("{:.1}s", elapsed.as_secs_f64())
        } else {
            format!("{}ms", elapsed.as_millis())
        }
    }
}

/// Configuration for the action log ring buffer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ActionLogConfig {
    /// Maximum number of entries kept
    pub capacity: usize,
    /// Which actions are recorded
    pub filter: ActionLoggerConfig,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            filter: ActionLoggerConfig::default(),
        }
    }
}

impl ActionLogConfig {
    /// Create with custom capacity and filter
    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self { capacity, filter }
    }
}

/// Ring buffer of recently reduced actions
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    config: ActionLogConfig,
    next_sequence: u64,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(ActionLogConfig::default())
    }
}

impl ActionLog {
    /// Create an empty log
    pub fn new(config: ActionLogConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity),
            config,
            next_sequence: 0,
        }
    }

    /// Record an action if it passes the filter.
    ///
    /// Returns whether it was recorded.
    pub fn record<A: ActionSummary>(&mut self, action: &A) -> bool {
        let name = action.name();
        if !self.config.filter.should_log(name) {
            return false;
        }

        let entry = ActionLogEntry::new(name, action.summary(), self.next_sequence);
        self.next_sequence += 1;

        if self.config.capacity == 0 {
            return true;
        }
        if self.entries.len() >= self.config.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        true
    }

    /// Set the `state_changed` flag of the newest entry
    pub fn mark_last(&mut self, changed: bool) {
        if let Some(entry) = self.entries.back_mut() {
            entry.state_changed = Some(changed);
        }
    }

    /// All entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// The most recent `count` entries, newest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Shared read access to an [`ActionLog`] owned by a running middleware.
#[derive(Debug, Clone, Default)]
pub struct ActionLogHandle {
    log: Arc<Mutex<ActionLog>>,
}

impl ActionLogHandle {
    fn new(config: ActionLogConfig) -> Self {
        Self {
            log: Arc::new(Mutex::new(ActionLog::new(config))),
        }
    }

    /// Copy of the most recent `count` entries, newest first
    pub fn recent(&self, count: usize) -> Vec<ActionLogEntry> {
        self.log.lock().recent(count).cloned().collect()
    }

    /// Copy of every stored entry, oldest first
    pub fn entries(&self) -> Vec<ActionLogEntry> {
        self.log.lock().entries().cloned().collect()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// Drop all stored entries
    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

/// Middleware that logs reduced actions with pattern filtering.
///
/// - **Tracing only** (default): emits `tracing::debug!` per action
/// - **With storage**: also records into an [`ActionLog`] readable through
///   [`log_handle`](Self::log_handle)
#[derive(Debug, Clone)]
pub struct ActionLoggerMiddleware {
    config: ActionLoggerConfig,
    log: Option<ActionLogHandle>,
    last_recorded: bool,
    active: bool,
}

impl ActionLoggerMiddleware {
    /// Tracing only, no storage
    pub fn new(config: ActionLoggerConfig) -> Self {
        Self {
            config,
            log: None,
            last_recorded: false,
            active: true,
        }
    }

    /// Tracing plus in-memory storage
    pub fn with_log(config: ActionLogConfig) -> Self {
        Self {
            config: config.filter.clone(),
            log: Some(ActionLogHandle::new(config)),
            last_recorded: false,
            active: true,
        }
    }

    /// Storage with the default configuration
    pub fn with_default_log() -> Self {
        Self::with_log(ActionLogConfig::default())
    }

    /// Enable or disable the middleware; inactive middleware does nothing.
    ///
    /// ```ignore
    /// let middleware = ActionLoggerMiddleware::with_default_log().active(args.verbose);
    /// ```
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Whether the middleware is active
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Handle to the stored history, if storage is enabled
    pub fn log_handle(&self) -> Option<ActionLogHandle> {
        self.log.clone()
    }

    /// The tracing filter
    pub fn config(&self) -> &ActionLoggerConfig {
        &self.config
    }
}

impl<A: ActionSummary> Middleware<A> for ActionLoggerMiddleware {
    fn before(&mut self, action: &A) {
        if !self.active {
            return;
        }

        let name = action.name();
        if self.config.should_log(name) {
            tracing::debug!(action = %name, "action");
        }

        self.last_recorded = match &self.log {
            Some(handle) => handle.log.lock().record(action),
            None => false,
        };
    }

    fn after(&mut self, _action: &A, state_changed: bool) {
        if !self.active || !self.last_recorded {
            return;
        }
        if let Some(handle) = &self.log {
            handle.log.lock().mark_last(state_changed);
        }
    }
}

/// Glob matching supporting `*` (zero or more characters) and `?` (exactly one).
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        match pattern.get(pi) {
            Some('*') => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == text[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match backtrack {
                Some((star_pi, star_ti)) => {
                    pi = star_pi + 1;
                    ti = star_ti + 1;
                    backtrack = Some((star_pi, star_ti + 1));
                }
                None => return false,
            },
        }
    }

    pattern[pi..].iter().all(|&c| c == '*')
}
