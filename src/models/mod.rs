//! 数据模型模块
//! 应用、能力位、权限记录、用户与权限矩阵

pub mod application;
pub mod auth;
pub mod capability;
pub mod matrix;
pub mod permission;
pub mod user;

pub use application::Application;
pub use capability::{Capability, CapabilitySet};
pub use permission::Permission;
pub use user::{Role, User};
