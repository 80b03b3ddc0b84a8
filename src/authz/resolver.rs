//! Route-to-application resolver
//!
//! Static tables describing which paths are assets, which are public, which
//! belong to the admin area and which application gates each path prefix.
//! All matching is a prefix match on the lowercased path.

use crate::models::Application;

/// Static file prefixes, never checked.
pub const STATIC_ASSET_PREFIXES: &[&str] = &["/css", "/js", "/lib", "/images"];

/// Paths reachable without any permission. Matches the path itself or anything below it.
pub const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/home",
    "/home/index",
    "/account/login",
    "/account/logout",
    "/account/accessdenied",
    "/error",
    "/health",
    "/ready",
];

/// Management area, protected by the admin role gate instead.
pub const ADMIN_PREFIXES: &[&str] = &["/admin", "/permissions"];

/// Path prefix to application, first match wins.
pub const APPLICATION_ROUTES: &[(&str, Application)] = &[
    ("/kiosk", Application::KioskRegistration),
    ("/bugs", Application::BugTracking),
    ("/features", Application::FeatureRequest),
    ("/developer", Application::DeveloperDashboard),
];

/// Classifies request paths against the route tables.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    static_prefixes: Vec<String>,
    public_paths: Vec<String>,
    admin_prefixes: Vec<String>,
    application_routes: Vec<(String, Application)>,
}

impl Default for RouteResolver {
    fn default() -> Self {
        Self::new(
            STATIC_ASSET_PREFIXES,
            PUBLIC_PATHS,
            ADMIN_PREFIXES,
            APPLICATION_ROUTES,
        )
    }
}

impl RouteResolver {
    pub fn new(
        static_prefixes: &[&str],
        public_paths: &[&str],
        admin_prefixes: &[&str],
        application_routes: &[(&str, Application)],
    ) -> Self {
        let lower = |items: &[&str]| items.iter().map(|s| s.to_lowercase()).collect();
        Self {
            static_prefixes: lower(static_prefixes),
            public_paths: lower(public_paths),
            admin_prefixes: lower(admin_prefixes),
            application_routes: application_routes
                .iter()
                .map(|(prefix, app)| (prefix.to_lowercase(), *app))
                .collect(),
        }
    }

    /// Lowercases the path. An empty path is treated as the root.
    pub fn normalize(path: &str) -> String {
        if path.is_empty() {
            "/".to_string()
        } else {
            path.to_lowercase()
        }
    }

    // The methods below expect a path already passed through `normalize`.

    pub fn is_static_asset(&self, path: &str) -> bool {
        self.static_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| {
            path == p
                || path
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn is_admin_area(&self, path: &str) -> bool {
        self.admin_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    pub fn resolve_application(&self, path: &str) -> Option<Application> {
        self.application_routes
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, app)| *app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(path: &str) -> Option<Application> {
        RouteResolver::default().resolve_application(&RouteResolver::normalize(path))
    }

    #[test]
    fn test_application_mapping_is_case_insensitive() {
        assert_eq!(resolve("/kiosk"), Some(Application::KioskRegistration));
        assert_eq!(resolve("/Kiosk/Create"), Some(Application::KioskRegistration));
        assert_eq!(resolve("/BUGS/12"), Some(Application::BugTracking));
        assert_eq!(resolve("/features"), Some(Application::FeatureRequest));
        assert_eq!(resolve("/developer/stats"), Some(Application::DeveloperDashboard));
        assert_eq!(resolve("/reports"), None);
    }

    #[test]
    fn test_public_paths_match_exact_or_below() {
        let resolver = RouteResolver::default();
        assert!(resolver.is_public("/"));
        assert!(resolver.is_public("/home"));
        assert!(resolver.is_public("/account/login"));
        assert!(resolver.is_public("/error/404"));
        // "/" only matches itself, not every path
        assert!(!resolver.is_public("/kiosk"));
        assert!(!resolver.is_public("/homepage"));
    }

    #[test]
    fn test_static_and_admin_prefixes() {
        let resolver = RouteResolver::default();
        assert!(resolver.is_static_asset("/css/site.css"));
        assert!(resolver.is_static_asset("/lib/jquery/jquery.js"));
        assert!(!resolver.is_static_asset("/kiosk"));

        assert!(resolver.is_admin_area("/permissions"));
        assert!(resolver.is_admin_area("/permissions/users/1"));
        assert!(resolver.is_admin_area("/admin/users"));
        assert!(!resolver.is_admin_area("/bugs"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(RouteResolver::normalize(""), "/");
        assert_eq!(RouteResolver::normalize("/Account/AccessDenied"), "/account/accessdenied");
    }
}
