use serde::{Deserialize, Serialize};

use super::{EntityKind, SyncedEntity};
use crate::sync::{EntityOperation, OperationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    General,
    Work,
    Study,
    Personal,
    Health,
    Finance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub text: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub completed: bool,
    pub created_at: i64,
    /// Set when the task is checked off; feeds the daily stats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    pub priority: Priority,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTodo {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    pub priority: Priority,
    pub category: Category,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodoUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// `Some(None)` is sent as `null` and clears the completion time.
    #[serde(
        default,
        deserialize_with = "super::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl TodoUpdate {
    pub fn complete(at_ms: i64) -> Self {
        Self {
            completed: Some(true),
            completed_at: Some(Some(at_ms)),
            ..Default::default()
        }
    }

    pub fn reopen() -> Self {
        Self {
            completed: Some(false),
            completed_at: Some(None),
            ..Default::default()
        }
    }

    /// A patch that reopens a todo always clears its completion time.
    fn normalized(mut self) -> Self {
        if self.completed == Some(false) {
            self.completed_at = Some(None);
        }
        self
    }
}

impl SyncedEntity for Todo {
    type Draft = NewTodo;
    type Patch = TodoUpdate;

    const KIND: EntityKind = EntityKind::Todo;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: &NewTodo, now_ms: i64) -> Self {
        Self {
            id,
            text: draft.text.clone(),
            completed: false,
            created_at: now_ms,
            completed_at: None,
            due_date: draft.due_date,
            priority: draft.priority,
            category: draft.category,
        }
    }

    fn normalize_patch(patch: TodoUpdate) -> TodoUpdate {
        patch.normalized()
    }

    fn into_pending(op: EntityOperation<Self>) -> OperationKind {
        OperationKind::Todo(op)
    }
}
