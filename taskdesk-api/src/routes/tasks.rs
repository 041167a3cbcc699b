/// Task endpoints
///
/// All routes require authentication. Non-admins only see and touch their
/// own tasks; listing and stats are scoped to the caller no matter which
/// `userId` they pass.
///
/// # Endpoints
///
/// - `POST /api/tasks` - Create a task owned by the caller
/// - `GET /api/tasks` - List with filters and pagination
/// - `GET /api/tasks/stats` - Aggregate counts
/// - `GET /api/tasks/:id` - Fetch one
/// - `PUT /api/tasks/:id` - Partial update
/// - `DELETE /api/tasks/:id` - Delete

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{CurrentUser, Normalize, ResourceId, ValidatedJson, ValidatedQuery},
    response::ApiResponse,
};
use axum::extract::State;
use serde::{Deserialize, Serialize};
use taskdesk_shared::models::page::Pagination;
use taskdesk_shared::models::task::{TaskFilter, TaskStats, TaskView, UpdateTask};
use taskdesk_shared::services::tasks::NewTask;
use taskdesk_shared::validation::{
    page_request, parse_datetime, trimmed, validate_future_date, validate_iso_date, validate_limit,
    validate_page, validate_priority, validate_status, validate_uuid,
};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(
        required(message = "Title is required"),
        length(min = 1, max = 100, message = "Title must be between 1 and 100 characters")
    )]
    pub title: Option<String>,

    #[validate(
        required(message = "Description is required"),
        length(min = 1, max = 500, message = "Description must be between 1 and 500 characters")
    )]
    pub description: Option<String>,

    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,

    #[validate(custom(function = "validate_priority"))]
    pub priority: Option<String>,

    /// ISO-8601, strictly in the future
    #[validate(custom(function = "validate_future_date"))]
    pub due_date: Option<String>,
}

impl Normalize for CreateTaskRequest {
    fn normalize(self) -> Self {
        Self {
            title: trimmed(self.title),
            description: trimmed(self.description),
            ..self
        }
    }
}

impl From<CreateTaskRequest> for NewTask {
    fn from(req: CreateTaskRequest) -> Self {
        NewTask {
            title: req.title.unwrap_or_default(),
            description: req.description.unwrap_or_default(),
            status: req.status.and_then(|s| s.parse().ok()),
            priority: req.priority.and_then(|p| p.parse().ok()),
            due_date: req.due_date.as_deref().and_then(parse_datetime),
        }
    }
}

/// Update task request; every field optional
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,

    #[validate(custom(function = "validate_priority"))]
    pub priority: Option<String>,

    #[validate(custom(function = "validate_future_date"))]
    pub due_date: Option<String>,
}

impl Normalize for UpdateTaskRequest {
    fn normalize(self) -> Self {
        Self {
            title: trimmed(self.title),
            description: trimmed(self.description),
            ..self
        }
    }
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status.and_then(|s| s.parse().ok()),
            priority: req.priority.and_then(|p| p.parse().ok()),
            due_date: req.due_date.as_deref().and_then(parse_datetime),
        }
    }
}

/// Listing query string
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    #[validate(custom(function = "validate_page"))]
    pub page: Option<String>,

    #[validate(custom(function = "validate_limit"))]
    pub limit: Option<String>,

    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,

    #[validate(custom(function = "validate_priority"))]
    pub priority: Option<String>,

    /// Owner filter; honoured for admins only
    #[validate(custom(function = "validate_uuid"))]
    pub user_id: Option<String>,

    /// Due on or before this instant
    #[validate(custom(function = "validate_iso_date"))]
    pub due_date: Option<String>,

    #[validate(length(max = 100, message = "Search cannot exceed 100 characters"))]
    pub search: Option<String>,
}

impl Normalize for ListTasksQuery {
    fn normalize(self) -> Self {
        Self {
            search: trimmed(self.search).filter(|s| !s.is_empty()),
            ..self
        }
    }
}

impl ListTasksQuery {
    fn filter(&self) -> TaskFilter {
        TaskFilter {
            owner_id: parse_user_id(self.user_id.as_deref()),
            status: self.status.as_deref().and_then(|s| s.parse().ok()),
            priority: self.priority.as_deref().and_then(|p| p.parse().ok()),
            due_before: self.due_date.as_deref().and_then(parse_datetime),
            search: self.search.clone(),
        }
    }
}

/// Stats query string
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    #[validate(custom(function = "validate_uuid"))]
    pub user_id: Option<String>,
}

impl Normalize for StatsQuery {
    fn normalize(self) -> Self {
        self
    }
}

fn parse_user_id(value: Option<&str>) -> Option<Uuid> {
    value.and_then(|v| Uuid::parse_str(v).ok())
}

#[derive(Debug, Serialize)]
pub struct TaskData {
    pub task: TaskView,
}

#[derive(Debug, Serialize)]
pub struct TaskListData {
    pub tasks: Vec<TaskView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub stats: TaskStats,
}

/// Create a task
///
/// # Errors
///
/// - `400 VALIDATION_ERROR`: includes `dueDate` when it is not in the future
pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateTaskRequest>,
) -> ApiResult<ApiResponse<TaskData>> {
    let task = state.task_service.create(&user, req.into()).await?;
    Ok(ApiResponse::created("Task created successfully", TaskData { task }))
}

/// List tasks
///
/// # Query
///
/// `page`, `limit` (1-100), `status`, `priority`, `userId` (admin only),
/// `dueDate` (due on or before), `search` (title or description,
/// case-insensitive)
pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedQuery(query): ValidatedQuery<ListTasksQuery>,
) -> ApiResult<ApiResponse<TaskListData>> {
    let page = page_request(query.page.as_deref(), query.limit.as_deref());
    let result = state.task_service.list(&user, query.filter(), page).await?;

    Ok(ApiResponse::ok(TaskListData {
        tasks: result.tasks,
        pagination: result.pagination,
    }))
}

/// Task statistics under the caller's scope
pub async fn task_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedQuery(query): ValidatedQuery<StatsQuery>,
) -> ApiResult<ApiResponse<StatsData>> {
    let stats = state
        .task_service
        .stats(&user, parse_user_id(query.user_id.as_deref()))
        .await?;
    Ok(ApiResponse::ok(StatsData { stats }))
}

/// Fetch one task
///
/// # Errors
///
/// - `400 INVALID_ID`
/// - `403 INSUFFICIENT_PERMISSIONS`: not the owner and not an admin
/// - `404 TASK_NOT_FOUND`
pub async fn get_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ResourceId(id): ResourceId,
) -> ApiResult<ApiResponse<TaskData>> {
    let task = state.task_service.get(&user, id).await?;
    Ok(ApiResponse::ok(TaskData { task }))
}

pub async fn update_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ResourceId(id): ResourceId,
    ValidatedJson(req): ValidatedJson<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<TaskData>> {
    let task = state.task_service.update(&user, id, req.into()).await?;
    Ok(ApiResponse::with_message("Task updated successfully", TaskData { task }))
}

pub async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ResourceId(id): ResourceId,
) -> ApiResult<ApiResponse<()>> {
    state.task_service.delete(&user, id).await?;
    Ok(ApiResponse::message("Task deleted successfully"))
}
