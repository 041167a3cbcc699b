/// Task service
///
/// Every operation takes the authenticated principal. Single-task
/// operations load the task first (404 if missing) and then apply
/// [`require_access`]; listings and stats run under [`scoped_owner`], so a
/// non-admin only ever sees their own tasks.
///
/// Responses embed an owner summary, looked up in one batch after the
/// primary fetch.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::ServiceError;
use crate::auth::authorization::{require_access, scoped_owner};
use crate::models::page::{PageRequest, Pagination};
use crate::models::task::{
    CreateTask, Task, TaskFilter, TaskPriority, TaskStats, TaskStatus, TaskView, UpdateTask,
};
use crate::models::user::{OwnerSummary, User};
use crate::store::{TaskStore, UserStore};

/// New task input; the owner is always the caller
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<chrono::DateTime<Utc>>,
}

/// One page of tasks with pagination metadata
#[derive(Debug, Clone)]
pub struct TaskPage {
    pub tasks: Vec<TaskView>,
    pub pagination: Pagination,
}

/// Task operations over a [`TaskStore`]
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    users: Arc<dyn UserStore>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskStore>, users: Arc<dyn UserStore>) -> Self {
        Self { tasks, users }
    }

    pub async fn create(&self, principal: &User, input: NewTask) -> Result<TaskView, ServiceError> {
        let task = self
            .tasks
            .create(CreateTask {
                title: input.title,
                description: input.description,
                status: input.status.unwrap_or_default(),
                priority: input.priority.unwrap_or_default(),
                due_date: input.due_date,
                owner_id: principal.id,
            })
            .await?;

        info!(task_id = %task.id, owner_id = %principal.id, "Task created");
        Ok(TaskView {
            task,
            owner: Some(OwnerSummary::from(principal)),
        })
    }

    /// Lists tasks under the caller's ownership scope
    ///
    /// `filter.owner_id` is honoured for admins only. For everyone else it
    /// is replaced by the caller's ID.
    pub async fn list(
        &self,
        principal: &User,
        mut filter: TaskFilter,
        page: PageRequest,
    ) -> Result<TaskPage, ServiceError> {
        filter.owner_id = scoped_owner(principal, filter.owner_id);
        debug!(?filter, page = page.page, limit = page.limit, "Listing tasks");

        let result = self.tasks.list(&filter, page).await?;
        let pagination = Pagination::new(page, result.total);
        let tasks = self.with_owners(result.items).await?;

        Ok(TaskPage { tasks, pagination })
    }

    pub async fn get(&self, principal: &User, id: Uuid) -> Result<TaskView, ServiceError> {
        let task = self.load_accessible(principal, id).await?;
        self.with_owner(task).await
    }

    /// Applies a partial update. Ownership is never changed.
    pub async fn update(&self, principal: &User, id: Uuid, input: UpdateTask) -> Result<TaskView, ServiceError> {
        self.load_accessible(principal, id).await?;

        let task = self
            .tasks
            .update(id, input)
            .await?
            .ok_or(ServiceError::TaskNotFound)?;

        info!(task_id = %id, updated_by = %principal.id, "Task updated");
        self.with_owner(task).await
    }

    pub async fn delete(&self, principal: &User, id: Uuid) -> Result<(), ServiceError> {
        self.load_accessible(principal, id).await?;

        if !self.tasks.delete(id).await? {
            return Err(ServiceError::TaskNotFound);
        }

        info!(task_id = %id, deleted_by = %principal.id, "Task deleted");
        Ok(())
    }

    /// Aggregate counts under the same scope as [`list`](Self::list)
    pub async fn stats(&self, principal: &User, requested_owner: Option<Uuid>) -> Result<TaskStats, ServiceError> {
        let owner = scoped_owner(principal, requested_owner);
        Ok(self.tasks.stats(owner, Utc::now()).await?)
    }

    async fn load_accessible(&self, principal: &User, id: Uuid) -> Result<Task, ServiceError> {
        let task = self
            .tasks
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::TaskNotFound)?;

        require_access(principal, task.owner_id)?;
        Ok(task)
    }

    async fn with_owner(&self, task: Task) -> Result<TaskView, ServiceError> {
        let owner = self
            .users
            .find_by_id(task.owner_id)
            .await?
            .map(|u| OwnerSummary::from(&u));
        Ok(TaskView { task, owner })
    }

    async fn with_owners(&self, tasks: Vec<Task>) -> Result<Vec<TaskView>, ServiceError> {
        let ids: Vec<Uuid> = tasks
            .iter()
            .map(|t| t.owner_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let owners: HashMap<Uuid, OwnerSummary> = self
            .users
            .find_by_ids(&ids)
            .await?
            .iter()
            .map(|u| (u.id, OwnerSummary::from(u)))
            .collect();

        Ok(tasks
            .into_iter()
            .map(|task| TaskView {
                owner: owners.get(&task.owner_id).cloned(),
                task,
            })
            .collect())
    }
}
