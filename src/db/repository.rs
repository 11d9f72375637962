//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    AssignmentDisposition, Confidence, CreateMemberRequest, Datastore, ExtractedTask,
    MembershipStatus, Priority, RevisionInfo, Task, TaskStatus, TeamMember, UnassignedReason,
    UpdateMemberRequest, UpdateTaskRequest,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    /// Get the full datastore.
    pub async fn get_datastore(&self) -> Result<Datastore, AppError> {
        let meta =
            sqlx::query("SELECT schema_version, revision_id, generated_at FROM meta WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;

        let members = self.list_members().await?;
        let tasks = self.list_tasks().await?;

        Ok(Datastore {
            schema_version: meta.get("schema_version"),
            revision_id: meta.get("revision_id"),
            generated_at: meta.get("generated_at"),
            members,
            tasks,
        })
    }

    // ==================== MEMBER OPERATIONS ====================

    /// List all members. This is the team roster fed to the assignee
    /// resolver.
    pub async fn list_members(&self) -> Result<Vec<TeamMember>, AppError> {
        let rows = sqlx::query(
            "SELECT id, username, full_name, display_name, email, membership_status, updated_at, version FROM members ORDER BY full_name, username"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    /// Get a member by ID.
    pub async fn get_member(&self, id: &str) -> Result<Option<TeamMember>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, full_name, display_name, email, membership_status, updated_at, version FROM members WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(member_from_row))
    }

    /// Create a new member.
    pub async fn create_member(
        &self,
        request: &CreateMemberRequest,
    ) -> Result<TeamMember, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO members (id, username, full_name, display_name, email, membership_status, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, 1)"
        )
        .bind(&id)
        .bind(&request.username)
        .bind(&request.full_name)
        .bind(&request.display_name)
        .bind(&request.email)
        .bind(request.membership_status.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(TeamMember {
            id,
            username: request.username.clone(),
            full_name: request.full_name.clone(),
            display_name: request.display_name.clone(),
            email: request.email.clone(),
            membership_status: request.membership_status,
            updated_at: now,
            version: 1,
        })
    }

    /// Update a member with optimistic concurrency control.
    pub async fn update_member(
        &self,
        id: &str,
        request: &UpdateMemberRequest,
    ) -> Result<TeamMember, AppError> {
        let existing = self
            .get_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;

        // Check version for optimistic concurrency
        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    current_version: existing.version,
                });
            }
        }

        let now = Utc::now().to_rfc3339();
        let new_version = existing.version + 1;

        let username = request.username.clone().or(existing.username.clone());
        let full_name = request.full_name.clone().or(existing.full_name.clone());
        let display_name = request
            .display_name
            .clone()
            .or(existing.display_name.clone());
        let email = request.email.clone().or(existing.email.clone());
        let membership_status = request
            .membership_status
            .unwrap_or(existing.membership_status);

        // Use conditional UPDATE with version check to prevent race conditions
        let result = sqlx::query(
            "UPDATE members SET username = ?, full_name = ?, display_name = ?, email = ?, membership_status = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?"
        )
        .bind(&username)
        .bind(&full_name)
        .bind(&display_name)
        .bind(&email)
        .bind(membership_status.as_str())
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Race condition - version changed between read and write
            let current = self.get_member(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|m| m.version).unwrap_or(0),
            });
        }

        self.increment_revision().await?;

        Ok(TeamMember {
            id: id.to_string(),
            username,
            full_name,
            display_name,
            email,
            membership_status,
            updated_at: now,
            version: new_version,
        })
    }

    /// Delete a member.
    pub async fn delete_member(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== TASK OPERATIONS ====================

    /// List all tasks.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, title, description, assignee, assignee_member_id,
                      assignee_display_name, unassigned_reason, priority, due_date,
                      optional, inferred, confidence, source_text, status,
                      created_at, updated_at, version
               FROM tasks ORDER BY created_at, title"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(task_from_row).collect())
    }

    /// Get a task by ID.
    pub async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, title, description, assignee, assignee_member_id,
                      assignee_display_name, unassigned_reason, priority, due_date,
                      optional, inferred, confidence, source_text, status,
                      created_at, updated_at, version
               FROM tasks WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(task_from_row))
    }

    /// Persist a normalized task together with its assignment disposition.
    pub async fn create_task(
        &self,
        task: &ExtractedTask,
        disposition: &AssignmentDisposition,
    ) -> Result<Task, AppError> {
        let mut tx = self.pool.begin().await?;
        let created = insert_task(&mut tx, task, disposition).await?;

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Persist a reviewed extraction result in one transaction. The revision
    /// is incremented once for the entire batch.
    pub async fn create_tasks(
        &self,
        items: &[(ExtractedTask, AssignmentDisposition)],
    ) -> Result<Vec<Task>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(items.len());

        for (task, disposition) in items {
            created.push(insert_task(&mut tx, task, disposition).await?);
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Update a task with optimistic concurrency control.
    ///
    /// A recomputed disposition is passed when the caller changed the
    /// assignee; otherwise the stored disposition is kept.
    pub async fn update_task(
        &self,
        id: &str,
        request: &UpdateTaskRequest,
        disposition: Option<&AssignmentDisposition>,
    ) -> Result<Task, AppError> {
        let existing = self
            .get_task(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))?;

        // Check version for optimistic concurrency
        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    current_version: existing.version,
                });
            }
        }

        let now = Utc::now().to_rfc3339();
        let new_version = existing.version + 1;

        let title = request.title.as_ref().unwrap_or(&existing.title);
        let description = request.description.clone().or(existing.description.clone());
        let assignee = request.assignee.clone().or(existing.assignee.clone());
        let priority = request.priority.unwrap_or(existing.priority);
        let due_date = request.due_date.clone().or(existing.due_date.clone());
        let optional = request.optional.unwrap_or(existing.optional);
        let status = request.status.unwrap_or(existing.status);

        let (member_id, display_name, reason) = match disposition {
            Some(d) => (
                d.resolved_member_id.clone(),
                d.resolved_display_name.clone(),
                d.unassigned_reason,
            ),
            None => (
                existing.assignee_member_id.clone(),
                existing.assignee_display_name.clone(),
                existing.unassigned_reason,
            ),
        };

        let result = sqlx::query(
            r#"UPDATE tasks SET
                title = ?, description = ?, assignee = ?, assignee_member_id = ?,
                assignee_display_name = ?, unassigned_reason = ?, priority = ?,
                due_date = ?, optional = ?, status = ?, updated_at = ?, version = ?
            WHERE id = ? AND version = ?"#,
        )
        .bind(title)
        .bind(&description)
        .bind(&assignee)
        .bind(&member_id)
        .bind(&display_name)
        .bind(reason.map(|r| r.as_str()))
        .bind(priority.as_str())
        .bind(&due_date)
        .bind(optional as i32)
        .bind(status.as_str())
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_task(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|t| t.version).unwrap_or(0),
            });
        }

        self.increment_revision().await?;

        Ok(Task {
            id: id.to_string(),
            title: title.clone(),
            description,
            assignee,
            assignee_member_id: member_id,
            assignee_display_name: display_name,
            unassigned_reason: reason,
            priority,
            due_date,
            optional,
            inferred: existing.inferred,
            confidence: existing.confidence,
            source_text: existing.source_text,
            status,
            created_at: existing.created_at,
            updated_at: now,
            version: new_version,
        })
    }

    /// Delete a task.
    pub async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

/// Insert one task row inside an open transaction.
async fn insert_task(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    task: &ExtractedTask,
    disposition: &AssignmentDisposition,
) -> Result<Task, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let description = Some(task.description.clone()).filter(|d| !d.is_empty());

    sqlx::query(
        r#"INSERT INTO tasks (
            id, title, description, assignee, assignee_member_id,
            assignee_display_name, unassigned_reason, priority, due_date,
            optional, inferred, confidence, source_text, status,
            created_at, updated_at, version
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"#,
    )
    .bind(&id)
    .bind(&task.title)
    .bind(&description)
    .bind(&task.assignee)
    .bind(&disposition.resolved_member_id)
    .bind(&disposition.resolved_display_name)
    .bind(disposition.unassigned_reason.map(|r| r.as_str()))
    .bind(task.priority.as_str())
    .bind(&task.due_date)
    .bind(task.optional as i32)
    .bind(task.inferred as i32)
    .bind(task.confidence.as_str())
    .bind(&task.source_text)
    .bind(TaskStatus::Open.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&mut **tx)
    .await?;

    Ok(Task {
        id,
        title: task.title.clone(),
        description,
        assignee: task.assignee.clone(),
        assignee_member_id: disposition.resolved_member_id.clone(),
        assignee_display_name: disposition.resolved_display_name.clone(),
        unassigned_reason: disposition.unassigned_reason,
        priority: task.priority,
        due_date: task.due_date.clone(),
        optional: task.optional,
        inferred: task.inferred,
        confidence: task.confidence,
        source_text: task.source_text.clone(),
        status: TaskStatus::Open,
        created_at: now.clone(),
        updated_at: now,
        version: 1,
    })
}

// Helper functions for row conversion

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> TeamMember {
    let status: String = row.get("membership_status");
    TeamMember {
        id: row.get("id"),
        username: row.get("username"),
        full_name: row.get("full_name"),
        display_name: row.get("display_name"),
        email: row.get("email"),
        membership_status: MembershipStatus::from_str(&status)
            .unwrap_or(MembershipStatus::Pending),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}

fn task_from_row(row: &sqlx::sqlite::SqliteRow) -> Task {
    let optional: i32 = row.get("optional");
    let inferred: i32 = row.get("inferred");
    let priority: String = row.get("priority");
    let confidence: String = row.get("confidence");
    let status: String = row.get("status");
    let unassigned_reason: Option<String> = row.get("unassigned_reason");

    Task {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        assignee: row.get("assignee"),
        assignee_member_id: row.get("assignee_member_id"),
        assignee_display_name: row.get("assignee_display_name"),
        unassigned_reason: unassigned_reason
            .as_deref()
            .and_then(UnassignedReason::from_str),
        priority: Priority::from_str(&priority).unwrap_or(Priority::Medium),
        due_date: row.get("due_date"),
        optional: optional != 0,
        inferred: inferred != 0,
        confidence: Confidence::from_str(&confidence).unwrap_or(Confidence::Medium),
        source_text: row.get("source_text"),
        status: TaskStatus::from_str(&status).unwrap_or(TaskStatus::Open),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
