//! Authorization decision pipeline
//!
//! Each request is run through [`PIPELINE`] in order; the first rule that
//! produces an [`Outcome`] ends the evaluation. Every rule can be evaluated on
//! its own, which is how the tests below exercise them.

use axum::http::Method;
use uuid::Uuid;

use super::resolver::RouteResolver;
use crate::{
    auth::AuthContext,
    error::AppError,
    models::{Application, Capability},
    services::PermissionService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    StaticAsset,
    PublicPath,
    AdminArea,
    Unauthenticated,
    MissingUserId,
    AdminBypass,
    UnmappedRoute,
    CapabilityCheck,
}

/// Evaluation order. Earlier rules take precedence.
pub const PIPELINE: [Rule; 8] = [
    Rule::StaticAsset,
    Rule::PublicPath,
    Rule::AdminArea,
    Rule::Unauthenticated,
    Rule::MissingUserId,
    Rule::AdminBypass,
    Rule::UnmappedRoute,
    Rule::CapabilityCheck,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not gated here; the named rule let the request through.
    PassThrough(Rule),
    Granted {
        user_id: Uuid,
        application: Application,
        capability: Capability,
    },
    Denied {
        user_id: Uuid,
        application: Application,
        capability: Capability,
    },
}

impl Outcome {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Outcome::Denied { .. })
    }
}

/// What the pipeline knows about one request.
#[derive(Debug, Clone)]
pub struct RequestFacts {
    pub path: String,
    pub method: Method,
    pub identity: Option<AuthContext>,
    /// Resolved once, reused by the routing rules.
    pub application: Option<Application>,
}

impl RequestFacts {
    pub fn new(
        resolver: &RouteResolver,
        path: &str,
        method: Method,
        identity: Option<AuthContext>,
    ) -> Self {
        let path = RouteResolver::normalize(path);
        let application = resolver.resolve_application(&path);
        Self {
            path,
            method,
            identity,
            application,
        }
    }

    fn user_id(&self) -> Option<Uuid> {
        self.identity.as_ref().and_then(AuthContext::user_id)
    }
}

impl Rule {
    /// Returns `Some` when this rule decides the request.
    pub async fn evaluate(
        self,
        facts: &RequestFacts,
        resolver: &RouteResolver,
        permissions: &PermissionService,
    ) -> Result<Option<Outcome>, AppError> {
        let pass = |matched: bool| matched.then_some(Outcome::PassThrough(self));

        let outcome = match self {
            Rule::StaticAsset => pass(resolver.is_static_asset(&facts.path)),
            Rule::PublicPath => pass(resolver.is_public(&facts.path)),
            Rule::AdminArea => pass(resolver.is_admin_area(&facts.path)),
            Rule::Unauthenticated => pass(facts.identity.is_none()),
            Rule::MissingUserId => pass(facts.user_id().is_none()),
            Rule::AdminBypass => match facts.user_id() {
                Some(user_id) => pass(permissions.is_admin(user_id).await?),
                None => pass(true),
            },
            Rule::UnmappedRoute => pass(facts.application.is_none()),
            Rule::CapabilityCheck => {
                let (Some(user_id), Some(application)) = (facts.user_id(), facts.application)
                else {
                    return Ok(pass(true));
                };
                let capability = Capability::for_method(&facts.method);

                let outcome = if permissions
                    .has_permission(user_id, application, capability)
                    .await?
                {
                    Outcome::Granted {
                        user_id,
                        application,
                        capability,
                    }
                } else {
                    Outcome::Denied {
                        user_id,
                        application,
                        capability,
                    }
                };
                Some(outcome)
            }
        };

        Ok(outcome)
    }
}

/// Runs the full pipeline.
pub async fn authorize(
    facts: &RequestFacts,
    resolver: &RouteResolver,
    permissions: &PermissionService,
) -> Result<Outcome, AppError> {
    for rule in PIPELINE {
        if let Some(outcome) = rule.evaluate(facts, resolver, permissions).await? {
            return Ok(outcome);
        }
    }

    // CapabilityCheck always decides
    Err(AppError::Internal(
        "authorization pipeline produced no decision".to_string(),
    ))
}
