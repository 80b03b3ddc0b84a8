//! Applications gated by the permission matrix

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::AppError;

/// A functional module of the platform that permissions are scoped to.
///
/// The set is closed: adding an application means adding a variant here (and to
/// the `application_permissions` CHECK constraint), not inserting data.
/// Declaration order is the canonical column order of the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Application {
    KioskRegistration,
    BugTracking,
    FeatureRequest,
    DeveloperDashboard,
}

impl Application {
    /// Every application, in canonical order.
    pub const ALL: [Application; 4] = [
        Application::KioskRegistration,
        Application::BugTracking,
        Application::FeatureRequest,
        Application::DeveloperDashboard,
    ];

    /// Identifier persisted in the store and used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Application::KioskRegistration => "KioskRegistration",
            Application::BugTracking => "BugTracking",
            Application::FeatureRequest => "FeatureRequest",
            Application::DeveloperDashboard => "DeveloperDashboard",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Application::KioskRegistration => "Kiosk Registration",
            Application::BugTracking => "Bug Tracking",
            Application::FeatureRequest => "Feature Request",
            Application::DeveloperDashboard => "Developer Dashboard",
        }
    }

    /// Material icon name shown next to the application
    pub fn icon(&self) -> &'static str {
        match self {
            Application::KioskRegistration => "devices",
            Application::BugTracking => "bug_report",
            Application::FeatureRequest => "lightbulb",
            Application::DeveloperDashboard => "code",
        }
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Application {
    type Err = AppError;

    /// Case-insensitive; anything outside the closed set is a validation failure.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Application::ALL
            .into_iter()
            .find(|app| app.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| AppError::Validation(format!("Unknown application: {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_applications() {
        for app in Application::ALL {
            assert_eq!(app.as_str().parse::<Application>().unwrap(), app);
        }
        assert_eq!(
            "kioskregistration".parse::<Application>().unwrap(),
            Application::KioskRegistration
        );
    }

    #[test]
    fn test_parse_unknown_application_is_validation_error() {
        let err = "Payroll".parse::<Application>().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!("".parse::<Application>().is_err());
    }

    #[test]
    fn test_canonical_order_matches_ord() {
        let mut sorted = Application::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Application::ALL.to_vec());
        assert_eq!(Application::ALL[0], Application::KioskRegistration);
    }

    #[test]
    fn test_metadata() {
        assert_eq!(Application::BugTracking.display_name(), "Bug Tracking");
        assert_eq!(Application::DeveloperDashboard.icon(), "code");
    }
}
