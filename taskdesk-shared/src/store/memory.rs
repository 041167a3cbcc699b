/// In-memory store
///
/// Keeps users and tasks in hash maps behind tokio `RwLock`s. Mirrors the
/// PostgreSQL store's semantics closely enough that the HTTP test suite
/// runs against it without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, TaskStore, UserStore};
use crate::models::page::{Page, PageRequest};
use crate::models::task::{
    CreateTask, Task, TaskFilter, TaskPriority, TaskStats, TaskStatus, UpdateTask,
};
use crate::models::user::{CreateUser, UpdateUser, User, UserFilter};

/// Process-local store for tests and development
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_in_use(users: &HashMap<Uuid, User>, email: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
}

/// Sorts newest first and cuts one page out of `items`
fn paginate<T, K: Ord>(mut items: Vec<T>, page: PageRequest, key: impl Fn(&T) -> K) -> Page<T> {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    let total = items.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let items = items
        .into_iter()
        .skip(offset)
        .take(page.limit as usize)
        .collect();
    Page { items, total }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, input: CreateUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if email_in_use(&users, &input.email, None) {
            return Err(StoreError::Duplicate {
                field: "email".to_string(),
            });
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: input.name,
            email: input.email.to_lowercase(),
            password_hash: input.password_hash,
            role: input.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn email_taken_by_other(&self, email: &str, except: Uuid) -> Result<bool, StoreError> {
        Ok(email_in_use(&*self.users.read().await, email, Some(except)))
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;

        if let Some(ref email) = input.email {
            if email_in_use(&users, email, Some(id)) {
                return Err(StoreError::Duplicate {
                    field: "email".to_string(),
                });
            }
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = input.name {
            user.name = name;
        }
        if let Some(email) = input.email {
            user.email = email.to_lowercase();
        }
        if let Some(hash) = input.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(active) = input.is_active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.users.write().await.remove(&id).is_some();
        if removed {
            self.tasks.write().await.retain(|_, t| t.owner_id != id);
        }
        Ok(removed)
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, StoreError> {
        let matching: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        Ok(paginate(matching, page, |u| (u.created_at, u.id)))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create(&self, input: CreateTask) -> Result<Task, StoreError> {
        if !self.users.read().await.contains_key(&input.owner_id) {
            return Err(StoreError::Backend(format!(
                "owner {} does not exist",
                input.owner_id
            )));
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            status: input.status,
            priority: input.priority,
            due_date: input.due_date,
            owner_id: input.owner_id,
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, input: UpdateTask) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = input.title {
            task.title = title;
        }
        if let Some(description) = input.description {
            task.description = description;
        }
        if let Some(status) = input.status {
            task.status = status;
        }
        if let Some(priority) = input.priority {
            task.priority = priority;
        }
        if let Some(due) = input.due_date {
            task.due_date = Some(due);
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tasks.write().await.remove(&id).is_some())
    }

    async fn list(&self, filter: &TaskFilter, page: PageRequest) -> Result<Page<Task>, StoreError> {
        let matching: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        Ok(paginate(matching, page, |t| (t.created_at, t.id)))
    }

    async fn stats(&self, owner_id: Option<Uuid>, now: DateTime<Utc>) -> Result<TaskStats, StoreError> {
        let tasks = self.tasks.read().await;
        let mut stats = TaskStats::default();

        for task in tasks
            .values()
            .filter(|t| owner_id.map_or(true, |owner| t.owner_id == owner))
        {
            stats.total += 1;
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
            if task.priority == TaskPriority::High {
                stats.high_priority += 1;
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
        }

        Ok(stats.with_completion_rate())
    }
}
