//! 认证服务：登录、默认账户初始化

use crate::{
    auth::{jwt::JwtService, password::PasswordHasher},
    config::AppConfig,
    error::AppError,
    models::{
        auth::{LoginRequest, LoginResponse},
        user::{NewUser, Role, User, UserResponse},
        Application, Capability,
    },
    repository::UserDirectory,
    services::PermissionService,
};
use secrecy::ExposeSecret;
use std::sync::Arc;

pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    jwt_service: Arc<JwtService>,
    config: Arc<AppConfig>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        jwt_service: Arc<JwtService>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            users,
            jwt_service,
            config,
            hasher: PasswordHasher::new(),
        }
    }

    /// 用户登录
    ///
    /// 用户不存在、密码错误、账户停用都返回同一个 Unauthorized
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        let user = match self.users.find_by_username(&req.username).await? {
            Some(user) => user,
            None => {
                tracing::info!(username = %req.username, "Login failed: unknown user");
                return Err(AppError::Unauthorized);
            }
        };

        // 检查账户状态
        if !user.is_active {
            tracing::info!(user_id = %user.id, "Login failed: account disabled");
            return Err(AppError::Unauthorized);
        }

        // 验证密码
        if let Err(e) = self.hasher.verify(&req.password, &user.password_hash) {
            tracing::info!(user_id = %user.id, "Login failed: bad password");
            return Err(e);
        }

        let access_token = self
            .jwt_service
            .generate_access_token(&user.id, &user.username)?;

        tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

        Ok(LoginResponse {
            access_token,
            expires_in: self.jwt_service.access_token_exp_secs(),
            user: UserResponse::from(user),
        })
    }

    /// 创建默认账户（已存在时跳过）
    ///
    /// admin 为管理员；user 为普通用户，并获得 KioskRegistration 的查看权限
    pub async fn seed_defaults(&self, permissions: &PermissionService) -> Result<(), AppError> {
        if self.users.find_by_username("admin").await?.is_some() {
            tracing::debug!("Default accounts already present, skipping seed");
            return Ok(());
        }

        let admin = self
            .create_account(
                "admin",
                "Amministratore Sistema",
                "admin@videosystem.it",
                self.config.seed.admin_password.expose_secret(),
                Role::Admin,
            )
            .await?;

        let user = match self.users.find_by_username("user").await? {
            Some(existing) => existing,
            None => {
                self.create_account(
                    "user",
                    "Utente Test",
                    "user@videosystem.it",
                    self.config.seed.user_password.expose_secret(),
                    Role::User,
                )
                .await?
            }
        };

        permissions
            .grant(user.id, Application::KioskRegistration, Capability::View, admin.id)
            .await?;

        tracing::info!(admin_id = %admin.id, user_id = %user.id, "Seeded default accounts");
        Ok(())
    }

    async fn create_account(
        &self,
        username: &str,
        full_name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AppError> {
        PasswordHasher::validate_password_policy(password, &self.config)?;
        let password_hash = self.hasher.hash(password)?;

        self.users
            .create(NewUser {
                username: username.to_string(),
                full_name: full_name.to_string(),
                email: Some(email.to_string()),
                password_hash,
                role,
            })
            .await
    }
}
