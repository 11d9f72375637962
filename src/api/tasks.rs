//! Task API endpoints.
//!
//! Create/update run the assignee resolver against the current roster and
//! persist the resulting disposition alongside the task.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{current_revision, error, success, ApiResult};
use crate::errors::AppError;
use crate::extract::{normalize, resolve_assignment};
use crate::models::{
    AssignmentDisposition, BatchCreateTasksRequest, CandidateTask, CreateTaskRequest,
    ExtractedTask, Task, TeamMember, UpdateTaskRequest,
};
use crate::AppState;

/// GET /api/tasks - List all tasks.
pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Vec<Task>> {
    let revision_id = current_revision(&state).await;

    match state.repo.list_tasks().await {
        Ok(tasks) => success(tasks, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/tasks/:id - Get a single task.
pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Task> {
    let revision_id = current_revision(&state).await;

    match state.repo.get_task(&id).await {
        Ok(Some(task)) => success(task, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Task {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/tasks - Create a new task.
pub async fn create_task(
    State(state): State<AppState>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<Task> {
    let revision_id = current_revision(&state).await;

    // Validate required fields
    if request.title.trim().is_empty() {
        return error(
            AppError::Validation("Title is required".to_string()),
            revision_id,
        );
    }

    let roster = match state.repo.list_members().await {
        Ok(members) => members,
        Err(e) => return error(e, revision_id),
    };
    let (task, disposition) = prepare_task(&request, &roster);

    match state.repo.create_task(&task, &disposition).await {
        Ok(task) => {
            // Index the new task
            if let Err(e) = state.search.index_task(&task).await {
                tracing::warn!("Failed to index task: {}", e);
            }

            let new_revision = current_revision(&state).await.max(revision_id);
            success(task, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/tasks/:id - Update a task.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Task> {
    let revision_id = current_revision(&state).await;

    // A changed assignee invalidates the stored disposition.
    let disposition = if request.assignee.is_some() || request.assignee_member_id.is_some() {
        let roster = match state.repo.list_members().await {
            Ok(members) => members,
            Err(e) => return error(e, revision_id),
        };
        Some(resolve_assignment(
            request.assignee_member_id.as_deref(),
            request.assignee.as_deref(),
            &roster,
        ))
    } else {
        None
    };

    match state
        .repo
        .update_task(&id, &request, disposition.as_ref())
        .await
    {
        Ok(task) => {
            // Re-index the updated task
            if let Err(e) = state.search.index_task(&task).await {
                tracing::warn!("Failed to re-index task: {}", e);
            }

            let new_revision = current_revision(&state).await.max(revision_id);
            success(task, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/tasks/:id - Delete a task.
pub async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = current_revision(&state).await;

    match state.repo.delete_task(&id).await {
        Ok(()) => {
            // Remove from search index
            if let Err(e) = state.search.remove_task(&id).await {
                tracing::warn!("Failed to remove task from index: {}", e);
            }

            let new_revision = current_revision(&state).await.max(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/tasks/batch - Persist a reviewed extraction result.
pub async fn batch_create_tasks(
    State(state): State<AppState>,
    Json(request): Json<BatchCreateTasksRequest>,
) -> ApiResult<Vec<Task>> {
    let revision_id = current_revision(&state).await;

    if request.tasks.is_empty() {
        return error(
            AppError::Validation("No tasks provided".to_string()),
            revision_id,
        );
    }
    if request.tasks.iter().any(|t| t.title.trim().is_empty()) {
        return error(
            AppError::Validation("Every task requires a title".to_string()),
            revision_id,
        );
    }

    let roster = match state.repo.list_members().await {
        Ok(members) => members,
        Err(e) => return error(e, revision_id),
    };

    let items: Vec<_> = request
        .tasks
        .iter()
        .map(|task_request| prepare_task(task_request, &roster))
        .collect();

    match state.repo.create_tasks(&items).await {
        Ok(tasks) => {
            // Index all created tasks
            for task in &tasks {
                if let Err(e) = state.search.index_task(task).await {
                    tracing::warn!("Failed to index task {}: {}", task.id, e);
                }
            }

            let new_revision = current_revision(&state).await.max(revision_id);
            success(tasks, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// Normalize the request through the candidate pipeline and resolve its
/// assignee against the roster.
fn prepare_task(
    request: &CreateTaskRequest,
    roster: &[TeamMember],
) -> (ExtractedTask, AssignmentDisposition) {
    let candidate = CandidateTask {
        title: request.title.clone(),
        description: request.description.clone().unwrap_or_default(),
        assignee_hint: request.assignee.clone(),
        due_date_hint: request.due_date.clone(),
        priority_hint: request.priority,
        confidence_hint: request.confidence,
        source_text: request.source_text.clone(),
        inferred: request.inferred,
        optional: request.optional,
    };

    let task = normalize(candidate);
    let disposition = resolve_assignment(
        request.assignee_member_id.as_deref(),
        task.assignee.as_deref(),
        roster,
    );

    (task, disposition)
}
