//! 权限检查服务
//!
//! Grant, revoke, batch save and query application permissions. Admin accounts
//! satisfy every capability check without stored records.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        matrix::{CapabilitySnapshot, PermissionMatrix, UserPermissionRow},
        Application, Capability, CapabilitySet, Permission, Role,
    },
    repository::{PermissionFilter, PermissionStore, UserDirectory},
};

pub struct PermissionService {
    store: Arc<dyn PermissionStore>,
    users: Arc<dyn UserDirectory>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn PermissionStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { store, users }
    }

    /// 检查用户是否拥有某应用上的某项能力
    pub async fn has_permission(
        &self,
        user_id: Uuid,
        application: Application,
        capability: Capability,
    ) -> Result<bool, AppError> {
        if self.is_admin(user_id).await? {
            return Ok(true);
        }

        let permission = self.store.find(user_id, application).await.map_err(|e| {
            log_store_failure("has_permission", user_id, Some(application), &e);
            e
        })?;

        Ok(permission.is_some_and(|p| p.allows(capability)))
    }

    /// 检查用户是否是管理员；用户不存在时返回 false
    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool, AppError> {
        let user = self.users.find_by_id(user_id).await.map_err(|e| {
            log_store_failure("is_admin", user_id, None, &e);
            e
        })?;

        Ok(user.is_some_and(|u| u.is_admin()))
    }

    /// 直接读取存储的记录，不做管理员放行
    pub async fn get_permission(
        &self,
        user_id: Uuid,
        application: Application,
    ) -> Result<Option<Permission>, AppError> {
        self.store.find(user_id, application).await.map_err(|e| {
            log_store_failure("get_permission", user_id, Some(application), &e);
            e
        })
    }

    /// 获取用户的所有权限记录
    pub async fn get_user_permissions(&self, user_id: Uuid) -> Result<Vec<Permission>, AppError> {
        self.store.list_by_user(user_id).await.map_err(|e| {
            log_store_failure("get_user_permissions", user_id, None, &e);
            e
        })
    }

    /// 授予单项能力（幂等）
    pub async fn grant(
        &self,
        user_id: Uuid,
        application: Application,
        capability: Capability,
        granted_by: Uuid,
    ) -> Result<Permission, AppError> {
        let existing = self.get_permission(user_id, application).await?;
        let capabilities = existing
            .as_ref()
            .map_or(CapabilitySet::empty(), |p| p.capabilities)
            | CapabilitySet::from(capability);

        let permission = self
            .store
            .upsert(user_id, application, capabilities, Some(granted_by))
            .await
            .map_err(|e| {
                log_store_failure("grant", user_id, Some(application), &e);
                e
            })?;

        if existing.is_none() {
            tracing::info!(
                user_id = %user_id,
                application = %application,
                capability = %capability,
                granted_by = %granted_by,
                "Granted permission"
            );
        } else {
            tracing::info!(
                user_id = %user_id,
                application = %application,
                capability = %capability,
                "Updated permission"
            );
        }

        Ok(permission)
    }

    /// 撤销单项能力（幂等）；全部清空时删除记录
    ///
    /// Returns the remaining record, or `None` when none is left.
    pub async fn revoke(
        &self,
        user_id: Uuid,
        application: Application,
        capability: Capability,
    ) -> Result<Option<Permission>, AppError> {
        let Some(existing) = self.get_permission(user_id, application).await? else {
            return Ok(None);
        };

        let remaining = existing.capabilities - CapabilitySet::from(capability);

        if remaining.is_empty() {
            self.store.delete(user_id, application).await.map_err(|e| {
                log_store_failure("revoke", user_id, Some(application), &e);
                e
            })?;

            tracing::info!(
                user_id = %user_id,
                application = %application,
                "Removed all permissions for application"
            );
            return Ok(None);
        }

        if remaining == existing.capabilities {
            return Ok(Some(existing));
        }

        let permission = self
            .store
            .upsert(user_id, application, remaining, existing.granted_by)
            .await
            .map_err(|e| {
                log_store_failure("revoke", user_id, Some(application), &e);
                e
            })?;

        tracing::info!(
            user_id = %user_id,
            application = %application,
            capability = %capability,
            "Revoked permission"
        );

        Ok(Some(permission))
    }

    /// 切换单项能力：读取当前值后设置为相反值，返回新值
    pub async fn toggle(
        &self,
        user_id: Uuid,
        application: Application,
        capability: Capability,
        acting_user: Uuid,
    ) -> Result<bool, AppError> {
        let current = self
            .get_permission(user_id, application)
            .await?
            .is_some_and(|p| p.allows(capability));

        if current {
            self.revoke(user_id, application, capability).await?;
        } else {
            self.grant(user_id, application, capability, acting_user).await?;
        }

        Ok(!current)
    }

    /// 批量保存：每个应用按给定集合整体替换，空集合删除记录
    ///
    /// Applications are processed one after another without a surrounding
    /// transaction. On failure the applications already written stay written;
    /// the failure is logged with what was persisted and then returned.
    pub async fn save_permissions(
        &self,
        user_id: Uuid,
        permissions: &BTreeMap<Application, CapabilitySet>,
        granted_by: Uuid,
    ) -> Result<(), AppError> {
        let mut persisted: Vec<Application> = Vec::with_capacity(permissions.len());

        for (&application, &capabilities) in permissions {
            let result = if capabilities.is_empty() {
                self.store.delete(user_id, application).await.map(|_| ())
            } else {
                self.store
                    .upsert(user_id, application, capabilities, Some(granted_by))
                    .await
                    .map(|_| ())
            };

            if let Err(e) = result {
                tracing::error!(
                    operation = "save_permissions",
                    user_id = %user_id,
                    application = %application,
                    persisted = ?persisted,
                    error = %e,
                    "Batch permission save failed part way"
                );
                return Err(e);
            }

            persisted.push(application);
        }

        tracing::info!(
            user_id = %user_id,
            granted_by = %granted_by,
            applications = persisted.len(),
            "Saved permissions"
        );

        Ok(())
    }

    /// 删除用户的所有权限记录
    pub async fn delete_all_permissions(&self, user_id: Uuid) -> Result<u64, AppError> {
        let removed = self.store.delete_by_user(user_id).await.map_err(|e| {
            log_store_failure("delete_all_permissions", user_id, None, &e);
            e
        })?;

        if removed > 0 {
            tracing::info!(user_id = %user_id, removed, "Deleted all permissions for user");
        }

        Ok(removed)
    }

    /// 权限矩阵：每个拥有匹配记录的用户一行
    pub async fn get_permission_matrix(
        &self,
        role_filter: Option<Role>,
        application_filter: Option<Application>,
    ) -> Result<PermissionMatrix, AppError> {
        self.build_matrix(role_filter, application_filter)
            .await
            .map_err(|e| {
                tracing::error!(
                    operation = "get_permission_matrix",
                    role_filter = ?role_filter,
                    application_filter = ?application_filter,
                    error = %e,
                    "Error building permission matrix"
                );
                e
            })
    }

    async fn build_matrix(
        &self,
        role_filter: Option<Role>,
        application_filter: Option<Application>,
    ) -> Result<PermissionMatrix, AppError> {
        let user_ids = match role_filter {
            Some(role) => Some(self.users.ids_in_role(role).await?),
            None => None,
        };

        let records = self
            .store
            .list(&PermissionFilter {
                user_ids,
                application: application_filter,
            })
            .await?;

        let applications = match application_filter {
            Some(app) => vec![app],
            None => Application::ALL.to_vec(),
        };

        let mut by_user: HashMap<Uuid, Vec<Permission>> = HashMap::new();
        for record in records {
            by_user.entry(record.user_id).or_default().push(record);
        }

        let user_ids: Vec<Uuid> = by_user.keys().copied().collect();
        let users = self.users.find_many(&user_ids).await?;

        let rows = users
            .into_iter()
            .map(|user| {
                let records = by_user.remove(&user.id).unwrap_or_default();
                let permissions = applications
                    .iter()
                    .map(|&app| {
                        let snapshot = records
                            .iter()
                            .find(|p| p.application == app)
                            .map(|p| CapabilitySnapshot {
                                permission_id: Some(p.id),
                                capabilities: p.capabilities,
                            })
                            .unwrap_or_default();
                        (app, snapshot)
                    })
                    .collect();

                UserPermissionRow {
                    user_id: user.id,
                    username: user.username,
                    full_name: user.full_name,
                    role: user.role,
                    is_active: user.is_active,
                    permissions,
                }
            })
            .collect();

        Ok(PermissionMatrix { rows, applications })
    }
}

fn log_store_failure(
    operation: &str,
    user_id: Uuid,
    application: Option<Application>,
    error: &AppError,
) {
    tracing::error!(
        operation,
        user_id = %user_id,
        application = ?application,
        error = %error,
        "Permission store failure"
    );
}
