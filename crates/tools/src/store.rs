//! In-memory todo collection shared by the tool catalog and any front end.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Priority tag attached to a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Low,
    Medium,
    High,
}

impl Tag {
    pub const ALL: [Tag; 3] = [Tag::Low, Tag::Medium, Tag::High];

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse a tag from its exact label.
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Bucket used by `TodoStats::by_tag` for todos without a tag.
pub const UNTAGGED: &str = "untagged";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub tag: Option<Tag>,
    pub due: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Todo {
    fn matches(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.content.to_lowercase().contains(needle_lower)
            || self.tag.is_some_and(|tag| tag.label().contains(needle_lower))
    }
}

/// Fields supplied when creating a todo.  `id` and `created_at` are always
/// assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewTodo {
    pub title: String,
    pub content: String,
    pub tag: Option<Tag>,
    pub due: Option<NaiveDate>,
    pub completed: bool,
}

impl NewTodo {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// Completion-status filter used by `list_todos`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    fn admits(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !todo.completed,
            Self::Completed => todo.completed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Tag label (or `"untagged"`) → count.
    pub by_tag: BTreeMap<String, usize>,
}

/// Insertion-ordered todo list plus the id counter.
///
/// Ids start at 1 and are never reused, even after the highest id is deleted.
#[derive(Debug)]
pub struct TodoStore {
    todos: Vec<Todo>,
    next_id: u64,
    revision: u64,
}

impl Default for TodoStore {
    fn default() -> Self {
        Self {
            todos: Vec::new(),
            next_id: 1,
            revision: 0,
        }
    }
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new todo and return a copy of it.  Title policy (non-empty
    /// and so on) is the caller's business.
    pub fn create(&mut self, new: NewTodo) -> Todo {
        let todo = Todo {
            id: self.next_id,
            title: new.title,
            content: new.content,
            tag: new.tag,
            due: new.due,
            completed: new.completed,
            created_at: Utc::now(),
        };
        self.next_id += 1;
        self.todos.push(todo.clone());
        self.revision += 1;
        todo
    }

    pub fn delete_by_id(&mut self, id: u64) -> Option<Todo> {
        let idx = self.todos.iter().position(|t| t.id == id)?;
        self.revision += 1;
        Some(self.todos.remove(idx))
    }

    pub fn set_completed(&mut self, id: u64, completed: bool) -> Option<Todo> {
        let todo = self.todos.iter_mut().find(|t| t.id == id)?;
        todo.completed = completed;
        let updated = todo.clone();
        self.revision += 1;
        Some(updated)
    }

    pub fn find(&self, id: u64) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    /// Case-insensitive substring search over title, content and tag label.
    pub fn search(&self, query: &str) -> Vec<Todo> {
        let needle = query.to_lowercase();
        self.todos
            .iter()
            .filter(|t| t.matches(&needle))
            .cloned()
            .collect()
    }

    pub fn filter_by_status(&self, filter: StatusFilter) -> Vec<Todo> {
        self.todos
            .iter()
            .filter(|t| filter.admits(t))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> TodoStats {
        let mut stats = TodoStats {
            total: self.todos.len(),
            ..Default::default()
        };
        for todo in &self.todos {
            let bucket = todo.tag.map(Tag::label).unwrap_or(UNTAGGED);
            *stats.by_tag.entry(bucket.to_string()).or_insert(0) += 1;
            if todo.completed {
                stats.completed += 1;
            } else {
                stats.pending += 1;
            }
        }
        stats
    }

    pub fn all(&self) -> &[Todo] {
        &self.todos
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    /// Bumped on every successful mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Cloneable handle to a `TodoStore` shared between tools and a front end.
///
/// Every access takes the lock for one synchronous operation only, so no
/// caller ever holds it across an `.await`.  Successful mutations publish
/// the new store revision on a watch channel; front ends subscribe to it to
/// know when to re-render.
#[derive(Debug, Clone)]
pub struct SharedTodoStore {
    inner: Arc<Mutex<TodoStore>>,
    changes: Arc<watch::Sender<u64>>,
}

impl Default for SharedTodoStore {
    fn default() -> Self {
        Self::new(TodoStore::default())
    }
}

impl SharedTodoStore {
    pub fn new(store: TodoStore) -> Self {
        let (changes, _) = watch::channel(store.revision());
        Self {
            inner: Arc::new(Mutex::new(store)),
            changes: Arc::new(changes),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TodoStore> {
        // Store operations never leave partial state behind.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a read-only closure against the store.
    pub fn read<R>(&self, f: impl FnOnce(&TodoStore) -> R) -> R {
        f(&*self.lock())
    }

    /// Run a mutating closure and notify subscribers if the store changed.
    pub fn update<R>(&self, f: impl FnOnce(&mut TodoStore) -> R) -> R {
        let mut store = self.lock();
        let before = store.revision();
        let result = f(&mut *store);
        let after = store.revision();
        drop(store);
        if after != before {
            self.changes.send_replace(after);
        }
        result
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn create(&self, new: NewTodo) -> Todo {
        self.update(|s| s.create(new))
    }

    pub fn delete_by_id(&self, id: u64) -> Option<Todo> {
        self.update(|s| s.delete_by_id(id))
    }

    pub fn set_completed(&self, id: u64, completed: bool) -> Option<Todo> {
        self.update(|s| s.set_completed(id, completed))
    }

    pub fn get(&self, id: u64) -> Option<Todo> {
        self.read(|s| s.find(id).cloned())
    }

    pub fn search(&self, query: &str) -> Vec<Todo> {
        self.read(|s| s.search(query))
    }

    pub fn filter_by_status(&self, filter: StatusFilter) -> Vec<Todo> {
        self.read(|s| s.filter_by_status(filter))
    }

    pub fn stats(&self) -> TodoStats {
        self.read(TodoStore::stats)
    }

    pub fn snapshot(&self) -> Vec<Todo> {
        self.read(|s| s.all().to_vec())
    }

    pub fn len(&self) -> usize {
        self.read(TodoStore::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(TodoStore::is_empty)
    }
}
