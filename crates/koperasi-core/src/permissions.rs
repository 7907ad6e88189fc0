//! # Role-Permission Gate
//!
//! Static role × module table consulted before rendering a module and again
//! before executing any mutating operation for it.
//!
//! ## The Matrix
//! ```text
//! ┌──────────────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┐
//! │ role         │dash │ pos │ inv │ sup │ fin │ mem │ act │ rep │ usr │
//! ├──────────────┼─────┼─────┼─────┼─────┼─────┼─────┼─────┼─────┼─────┤
//! │ DEVELOPER    │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │
//! │ SUPER_ADMIN  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │
//! │ ADMIN        │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │  ✓  │     │
//! │ KASIR        │  ✓  │  ✓  │     │     │     │     │     │     │     │
//! │ STAFF        │  ✓  │     │  ✓  │     │     │     │     │     │     │
//! │ SUPPLIER     │  ✓  │     │     │  ✓  │     │     │     │     │     │
//! └──────────────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┘
//! ```
//!
//! Roles do not inherit from each other. Each role owns its own explicit
//! capability list; a module is reachable only if it appears in that list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Role
// =============================================================================

/// A user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Developer,
    SuperAdmin,
    Admin,
    Kasir,
    Staff,
    Supplier,
}

const DEVELOPER_MODULES: &[Module] = &[
    Module::Dashboard,
    Module::Pos,
    Module::Inventory,
    Module::Suppliers,
    Module::Financial,
    Module::Members,
    Module::Activity,
    Module::Reports,
    Module::Users,
];

const SUPER_ADMIN_MODULES: &[Module] = &[
    Module::Dashboard,
    Module::Pos,
    Module::Inventory,
    Module::Suppliers,
    Module::Financial,
    Module::Members,
    Module::Activity,
    Module::Reports,
    Module::Users,
];

const ADMIN_MODULES: &[Module] = &[
    Module::Dashboard,
    Module::Pos,
    Module::Inventory,
    Module::Suppliers,
    Module::Financial,
    Module::Members,
    Module::Activity,
    Module::Reports,
];

const KASIR_MODULES: &[Module] = &[Module::Dashboard, Module::Pos];

const STAFF_MODULES: &[Module] = &[Module::Dashboard, Module::Inventory];

const SUPPLIER_MODULES: &[Module] = &[Module::Dashboard, Module::Suppliers];

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Developer,
        Role::SuperAdmin,
        Role::Admin,
        Role::Kasir,
        Role::Staff,
        Role::Supplier,
    ];

    /// The modules this role may open.
    pub fn modules(self) -> &'static [Module] {
        match self {
            Role::Developer => DEVELOPER_MODULES,
            Role::SuperAdmin => SUPER_ADMIN_MODULES,
            Role::Admin => ADMIN_MODULES,
            Role::Kasir => KASIR_MODULES,
            Role::Staff => STAFF_MODULES,
            Role::Supplier => SUPPLIER_MODULES,
        }
    }

    pub fn can_access(self, module: Module) -> bool {
        self.modules().contains(&module)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Developer => "DEVELOPER",
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Kasir => "KASIR",
            Role::Staff => "STAFF",
            Role::Supplier => "SUPPLIER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

// =============================================================================
// Module
// =============================================================================

/// An application module guarded by the permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Dashboard,
    Pos,
    Inventory,
    Suppliers,
    Financial,
    Members,
    Activity,
    Reports,
    Users,
    /// Login / logout events; not a gated module.
    Auth,
}

impl Module {
    pub fn as_str(self) -> &'static str {
        match self {
            Module::Dashboard => "dashboard",
            Module::Pos => "pos",
            Module::Inventory => "inventory",
            Module::Suppliers => "suppliers",
            Module::Financial => "financial",
            Module::Members => "members",
            Module::Activity => "activity",
            Module::Reports => "reports",
            Module::Users => "users",
            Module::Auth => "auth",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let module = match s.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Module::Dashboard,
            "pos" => Module::Pos,
            "inventory" | "products" => Module::Inventory,
            "suppliers" => Module::Suppliers,
            "financial" => Module::Financial,
            "members" => Module::Members,
            "activity" => Module::Activity,
            "reports" => Module::Reports,
            "users" => Module::Users,
            "auth" => Module::Auth,
            other => return Err(format!("unknown module '{}'", other)),
        };
        Ok(module)
    }
}

// =============================================================================
// Gate
// =============================================================================

/// Looks up whether `role` may open the module named `module_name`.
///
/// Unknown module names are never accessible.
///
/// ## Example
/// ```rust
/// use koperasi_core::permissions::{can_access_module, Role};
///
/// assert!(!can_access_module(Role::Kasir, "suppliers"));
/// assert!(can_access_module(Role::Admin, "financial"));
/// ```
pub fn can_access_module(role: Role, module_name: &str) -> bool {
    match module_name.parse::<Module>() {
        Ok(module) => role.can_access(module),
        Err(_) => false,
    }
}

/// Fails with `Unauthorized` when the role lacks the module.
pub fn ensure_access(role: Role, module: Module) -> CoreResult<()> {
    if role.can_access(module) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized { role, module })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kasir_cannot_open_suppliers() {
        assert!(!can_access_module(Role::Kasir, "suppliers"));
        assert!(can_access_module(Role::Kasir, "pos"));
    }

    #[test]
    fn test_admin_can_open_financial_but_not_users() {
        assert!(can_access_module(Role::Admin, "financial"));
        assert!(!can_access_module(Role::Admin, "users"));
    }

    #[test]
    fn test_top_roles_open_everything() {
        for module in DEVELOPER_MODULES {
            assert!(Role::Developer.can_access(*module));
            assert!(Role::SuperAdmin.can_access(*module));
        }
    }

    #[test]
    fn test_unknown_module_denied() {
        for role in Role::ALL {
            assert!(!can_access_module(role, "payroll"));
        }
    }

    #[test]
    fn test_every_role_reaches_dashboard() {
        for role in Role::ALL {
            assert!(role.can_access(Module::Dashboard), "{} lacks dashboard", role);
        }
    }

    #[test]
    fn test_ensure_access_reports_role_and_module() {
        let err = ensure_access(Role::Staff, Module::Financial).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Role STAFF may not access module financial"
        );
        assert!(ensure_access(Role::Staff, Module::Inventory).is_ok());
    }

    #[test]
    fn test_role_parse_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!("kasir".parse::<Role>().unwrap(), Role::Kasir);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_screaming_snake() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
    }
}
