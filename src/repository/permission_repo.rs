//! Application permission repository (权限记录数据访问)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{empty_set_error, PermissionFilter, PermissionStore};
use crate::{
    error::AppError,
    models::{Application, CapabilitySet, Permission},
};

const COLUMNS: &str =
    "id, user_id, application_name, capabilities, granted_by, granted_at, updated_at";

/// Raw `application_permissions` row
#[derive(Debug, sqlx::FromRow)]
struct PermissionRow {
    id: i64,
    user_id: Uuid,
    application_name: String,
    capabilities: i16,
    granted_by: Option<Uuid>,
    granted_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PermissionRow> for Permission {
    type Error = AppError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        let application = row.application_name.parse::<Application>().map_err(|_| {
            AppError::Internal(format!(
                "permission {} has unknown application {}",
                row.id, row.application_name
            ))
        })?;

        Ok(Permission {
            id: row.id,
            user_id: row.user_id,
            application,
            capabilities: CapabilitySet::from_stored(row.capabilities),
            granted_by: row.granted_by,
            granted_at: row.granted_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_permissions(rows: Vec<PermissionRow>) -> Result<Vec<Permission>, AppError> {
    let mut permissions = rows
        .into_iter()
        .map(Permission::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    // 按规范顺序排列（数据库按字符串排序）
    permissions.sort_by_key(|p| (p.user_id, p.application));
    Ok(permissions)
}

pub struct PermissionRepository {
    db: PgPool,
}

impl PermissionRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PermissionStore for PermissionRepository {
    async fn find(
        &self,
        user_id: Uuid,
        application: Application,
    ) -> Result<Option<Permission>, AppError> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {COLUMNS} FROM application_permissions WHERE user_id = $1 AND application_name = $2"
        ))
        .bind(user_id)
        .bind(application.as_str())
        .fetch_optional(&self.db)
        .await?;

        row.map(Permission::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Permission>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {COLUMNS} FROM application_permissions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        into_permissions(rows)
    }

    async fn list(&self, filter: &PermissionFilter) -> Result<Vec<Permission>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM application_permissions
            WHERE ($1::uuid[] IS NULL OR user_id = ANY($1))
              AND ($2::varchar IS NULL OR application_name = $2)
            "#
        ))
        .bind(filter.user_ids.as_deref())
        .bind(filter.application.map(|app| app.as_str()))
        .fetch_all(&self.db)
        .await?;

        into_permissions(rows)
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        application: Application,
        capabilities: CapabilitySet,
        granted_by: Option<Uuid>,
    ) -> Result<Permission, AppError> {
        if capabilities.is_empty() {
            return Err(empty_set_error(user_id, application));
        }

        // 唯一索引 (user_id, application_name) 保证并发授权不会产生重复行
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            r#"
            INSERT INTO application_permissions (user_id, application_name, capabilities, granted_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, application_name)
            DO UPDATE SET
                capabilities = EXCLUDED.capabilities,
                updated_at = NOW()
            RETURNING {COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(application.as_str())
        .bind(capabilities.to_stored())
        .bind(granted_by)
        .fetch_one(&self.db)
        .await?;

        Permission::try_from(row)
    }

    async fn delete(&self, user_id: Uuid, application: Application) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM application_permissions WHERE user_id = $1 AND application_name = $2",
        )
        .bind(user_id)
        .bind(application.as_str())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM application_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
