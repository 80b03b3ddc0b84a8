//! 平台门户权限核心
//! 用户 × 应用 × 能力的权限矩阵，以及基于路由的请求授权

pub mod auth;
pub mod authz;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
