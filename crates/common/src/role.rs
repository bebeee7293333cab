//! Normalized authorization roles.

use serde::{Deserialize, Serialize};

/// Authorization capability attached to a user account.
///
/// Roles are normalized once, when a user record is loaded; the rest of
/// the codebase only ever sees this enum. Two legacy spellings from older
/// seed data (`admin`, `superadmin`) are accepted on read but never
/// written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Ordinary customer.
    User,
    /// Canteen staff: catalog and order management.
    AdminCanteen,
    /// Full back-office access, including user management.
    SuperAdmin,
}

impl Role {
    /// Parses a stored role name, tolerating the legacy aliases.
    ///
    /// Matching is case-sensitive against the fixed set; unknown names
    /// fall back to `User` so a corrupt row can never grant privileges.
    pub fn from_name(name: &str) -> Self {
        match name {
            "admin_canteen" | "admin" => Role::AdminCanteen,
            "super_admin" | "superadmin" => Role::SuperAdmin,
            _ => Role::User,
        }
    }

    /// Canonical stored name for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::AdminCanteen => "admin_canteen",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Returns true for roles allowed into the back office.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::AdminCanteen | Role::SuperAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_roundtrip() {
        for role in [Role::User, Role::AdminCanteen, Role::SuperAdmin] {
            assert_eq!(Role::from_name(role.as_str()), role);
        }
    }

    #[test]
    fn legacy_aliases_normalize() {
        assert_eq!(Role::from_name("admin"), Role::AdminCanteen);
        assert_eq!(Role::from_name("superadmin"), Role::SuperAdmin);
    }

    #[test]
    fn unknown_names_demote_to_user() {
        assert_eq!(Role::from_name("root"), Role::User);
        assert_eq!(Role::from_name("Admin"), Role::User);
        assert_eq!(Role::from_name(""), Role::User);
    }

    #[test]
    fn staff_check() {
        assert!(!Role::User.is_staff());
        assert!(Role::AdminCanteen.is_staff());
        assert!(Role::SuperAdmin.is_staff());
    }
}
