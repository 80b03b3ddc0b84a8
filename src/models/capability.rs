//! Capabilities and capability sets

use axum::http::Method;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::AppError;

/// A single permission bit scoped to one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    View,
    Create,
    Edit,
    Delete,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::View,
        Capability::Create,
        Capability::Edit,
        Capability::Delete,
    ];

    /// Capability an HTTP verb requires on a gated route.
    ///
    /// Unknown verbs fall back to `View`.
    pub fn for_method(method: &Method) -> Self {
        match *method {
            Method::GET => Capability::View,
            Method::POST => Capability::Create,
            Method::PUT | Method::PATCH => Capability::Edit,
            Method::DELETE => Capability::Delete,
            _ => Capability::View,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::View => "View",
            Capability::Create => "Create",
            Capability::Edit => "Edit",
            Capability::Delete => "Delete",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "view" => Ok(Capability::View),
            "create" => Ok(Capability::Create),
            "edit" => Ok(Capability::Edit),
            "delete" => Ok(Capability::Delete),
            other => Err(AppError::Validation(format!("Unknown permission type: {}", other))),
        }
    }
}

bitflags! {
    /// The capabilities held on one application.
    ///
    /// This is the only representation of granted capabilities; the boolean
    /// accessors are derived from it. The bit values are what the store persists.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CapabilitySet: u8 {
        const VIEW = 1 << 0;
        const CREATE = 1 << 1;
        const EDIT = 1 << 2;
        const DELETE = 1 << 3;
    }
}

impl Default for CapabilitySet {
    fn default() -> Self {
        CapabilitySet::empty()
    }
}

impl From<Capability> for CapabilitySet {
    fn from(capability: Capability) -> Self {
        match capability {
            Capability::View => CapabilitySet::VIEW,
            Capability::Create => CapabilitySet::CREATE,
            Capability::Edit => CapabilitySet::EDIT,
            Capability::Delete => CapabilitySet::DELETE,
        }
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter()
            .fold(CapabilitySet::empty(), |set, cap| set | CapabilitySet::from(cap))
    }
}

impl CapabilitySet {
    /// Builds a set from the four boolean columns used by forms and views.
    pub fn from_flags(view: bool, create: bool, edit: bool, delete: bool) -> Self {
        let mut set = CapabilitySet::empty();
        set.set(CapabilitySet::VIEW, view);
        set.set(CapabilitySet::CREATE, create);
        set.set(CapabilitySet::EDIT, edit);
        set.set(CapabilitySet::DELETE, delete);
        set
    }

    /// Decodes a persisted value; bits outside the four capabilities are dropped.
    pub fn from_stored(value: i16) -> Self {
        CapabilitySet::from_bits_truncate(value as u8)
    }

    pub fn to_stored(self) -> i16 {
        self.bits() as i16
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.contains(capability.into())
    }

    pub fn can_view(&self) -> bool {
        self.allows(Capability::View)
    }

    pub fn can_create(&self) -> bool {
        self.allows(Capability::Create)
    }

    pub fn can_edit(&self) -> bool {
        self.allows(Capability::Edit)
    }

    pub fn can_delete(&self) -> bool {
        self.allows(Capability::Delete)
    }

    /// Individual capabilities in the set, in `Capability::ALL` order.
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.allows(*cap))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_mapping() {
        assert_eq!(Capability::for_method(&Method::GET), Capability::View);
        assert_eq!(Capability::for_method(&Method::POST), Capability::Create);
        assert_eq!(Capability::for_method(&Method::PUT), Capability::Edit);
        assert_eq!(Capability::for_method(&Method::PATCH), Capability::Edit);
        assert_eq!(Capability::for_method(&Method::DELETE), Capability::Delete);
        assert_eq!(Capability::for_method(&Method::HEAD), Capability::View);
        assert_eq!(Capability::for_method(&Method::OPTIONS), Capability::View);
    }

    #[test]
    fn test_flags_round_trip_through_accessors() {
        let set = CapabilitySet::from_flags(true, false, true, false);
        assert!(set.can_view());
        assert!(!set.can_create());
        assert!(set.can_edit());
        assert!(!set.can_delete());
        assert_eq!(set.capabilities(), vec![Capability::View, Capability::Edit]);
    }

    #[test]
    fn test_collect_capabilities() {
        let set: CapabilitySet = [Capability::Delete, Capability::View].into_iter().collect();
        assert_eq!(set, CapabilitySet::VIEW | CapabilitySet::DELETE);
        assert!(set.allows(Capability::Delete));
        assert!(!set.allows(Capability::Create));
    }

    #[test]
    fn test_stored_value_drops_unknown_bits() {
        assert_eq!(CapabilitySet::from_stored(0b1_0001), CapabilitySet::VIEW);
        assert_eq!(CapabilitySet::all().to_stored(), 15);
        assert!(CapabilitySet::from_stored(0).is_empty());
    }

    #[test]
    fn test_parse_capability() {
        assert_eq!("VIEW".parse::<Capability>().unwrap(), Capability::View);
        assert_eq!("delete".parse::<Capability>().unwrap(), Capability::Delete);
        assert!("admin".parse::<Capability>().is_err());
    }
}
