//! Request authorization: route resolution, decision pipeline and the axum
//! middleware built on them

pub mod middleware;
pub mod resolver;
pub mod rules;

pub use middleware::{permission_middleware, require_admin_middleware};
pub use resolver::RouteResolver;
pub use rules::{authorize, Outcome, RequestFacts, Rule};
