//! # Caller Scope
//!
//! Caller identity, roles, capabilities and tenant scope resolution.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller { role, tenant_id }                                             │
//! │        │                                                                │
//! │        ├── role = super_admin, tenant_id = None ──► TenantScope::Global │
//! │        │                                            (no filter)         │
//! │        │                                                                │
//! │        └── otherwise ─────────────────────────────► TenantScope::Tenant │
//! │                                                     (tenant_id = ?)     │
//! │                                                                         │
//! │  Reads are filtered by the scope; writes are stamped with tenant_id.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Roles and Capabilities
// =============================================================================

/// Closed set of user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator; may act without a tenant.
    SuperAdmin,
    Admin,
    Manager,
    Cashier,
}

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    RecordSale,
    ViewSales,
    OperateDrawer,
    ViewStock,
    AdjustStock,
}

impl Capability {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Capability::RecordSale => "record sales",
            Capability::ViewSales => "view sales",
            Capability::OperateDrawer => "operate a cash drawer",
            Capability::ViewStock => "view stock",
            Capability::AdjustStock => "adjust stock",
        }
    }
}

impl Role {
    pub const ALL: [Role; 4] = [Role::SuperAdmin, Role::Admin, Role::Manager, Role::Cashier];

    /// Permission table.
    ///
    /// | Capability    | super_admin | admin | manager | cashier |
    /// |---------------|-------------|-------|---------|---------|
    /// | RecordSale    | ✓           | ✓     | ✓       | ✓       |
    /// | ViewSales     | ✓           | ✓     | ✓       | ✓       |
    /// | OperateDrawer | ✓           | ✓     | ✓       | ✓       |
    /// | ViewStock     | ✓           | ✓     | ✓       | ✓       |
    /// | AdjustStock   | ✓           | ✓     | ✓       |         |
    pub const fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::RecordSale
            | Capability::ViewSales
            | Capability::OperateDrawer
            | Capability::ViewStock => true,
            Capability::AdjustStock => !matches!(self, Role::Cashier),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Tenant Scope
// =============================================================================

/// Filter predicate applied to every read and write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantScope {
    /// No filter: sees every tenant.
    Global,
    /// Only rows whose `tenant_id` equals this id.
    Tenant(String),
}

impl TenantScope {
    /// The tenant filter as a nullable bind value.
    ///
    /// Repositories bind this into `(?1 IS NULL OR tenant_id = ?1)`.
    pub fn filter(&self) -> Option<&str> {
        match self {
            TenantScope::Global => None,
            TenantScope::Tenant(id) => Some(id.as_str()),
        }
    }
}

// =============================================================================
// Caller
// =============================================================================

/// An authenticated caller.
///
/// Fields are private so that every `Caller` upholds the tenant rule: only a
/// super admin may exist without a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    user_id: String,
    username: String,
    role: Role,
    tenant_id: Option<String>,
    branch_id: Option<String>,
}

impl Caller {
    /// Builds a caller, rejecting a tenant-less non-super-admin.
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        role: Role,
        tenant_id: Option<String>,
        branch_id: Option<String>,
    ) -> CoreResult<Self> {
        let user_id = user_id.into();
        let tenant_id = tenant_id.filter(|t| !t.is_empty());

        if tenant_id.is_none() && role != Role::SuperAdmin {
            return Err(CoreError::MissingTenant { user_id });
        }

        Ok(Caller {
            user_id,
            username: username.into(),
            role,
            tenant_id,
            branch_id: branch_id.filter(|b| !b.is_empty()),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn branch_id(&self) -> Option<&str> {
        self.branch_id.as_deref()
    }

    /// Tenant Scope Resolver.
    ///
    /// A tenant-less caller is by construction a super admin and resolves to
    /// `Global`. A super admin attached to a tenant is scoped to it.
    pub fn scope(&self) -> TenantScope {
        match &self.tenant_id {
            None => TenantScope::Global,
            Some(id) => TenantScope::Tenant(id.clone()),
        }
    }

    /// Checks the permission table, returning `Forbidden` on denial.
    pub fn require(&self, capability: Capability) -> CoreResult<()> {
        if self.role.can(capability) {
            Ok(())
        } else {
            Err(CoreError::Forbidden {
                role: self.role.to_string(),
                action: capability.as_str().to_string(),
            })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
