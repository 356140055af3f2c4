//! Role-based access control.
//!
//! [`AccessGate`] is the capability check the exchange relies on: it never
//! enumerates roles itself, it only asks "does P hold R?". [`RoleRegistry`]
//! is the in-memory implementation, with per-role admin roles. Every role
//! is administered by [`RoleId::DEFAULT_ADMIN`] unless reconfigured.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokensale_types::{Principal, Result, RoleId, SaleError};

/// Capability contract of an access-control provider.
pub trait AccessGate: Send + Sync {
    fn has_role(&self, role: &RoleId, principal: &Principal) -> bool;

    /// Grant `role` to `principal` without an authority check.
    ///
    /// Reserved for deployment-time bootstrapping (granting the initial admin).
    fn grant_role(&self, role: &RoleId, principal: &Principal);

    /// Guard: `Ok(())` if `principal` holds `role`, else
    /// [`SaleError::Unauthorized`].
    fn check_role(&self, role: &RoleId, principal: &Principal) -> Result<()> {
        if self.has_role(role, principal) {
            Ok(())
        } else {
            Err(SaleError::Unauthorized {
                principal: *principal,
                role: *role,
            })
        }
    }
}

#[derive(Debug, Default)]
struct Roles {
    members: HashMap<RoleId, HashSet<Principal>>,
    admins: HashMap<RoleId, RoleId>,
}

/// In-memory role store.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    roles: RwLock<Roles>,
}

impl RoleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The role whose members may grant and revoke `role`.
    #[must_use]
    pub fn role_admin(&self, role: &RoleId) -> RoleId {
        self.read()
            .admins
            .get(role)
            .copied()
            .unwrap_or(RoleId::DEFAULT_ADMIN)
    }

    /// Grant `role` to `account`, on behalf of `sender`.
    ///
    /// Returns `true` if the membership is new.
    pub fn grant_role_as(&self, sender: &Principal, role: &RoleId, account: &Principal) -> Result<bool> {
        self.check_role(&self.role_admin(role), sender)?;
        let added = self.write().members.entry(*role).or_default().insert(*account);
        if added {
            tracing::info!(%role, account = %account, sender = %sender, "Role granted");
        }
        Ok(added)
    }

    /// Revoke `role` from `account`, on behalf of `sender`.
    ///
    /// Returns `true` if a membership was removed.
    pub fn revoke_role_as(&self, sender: &Principal, role: &RoleId, account: &Principal) -> Result<bool> {
        self.check_role(&self.role_admin(role), sender)?;
        let removed = self.remove(role, account);
        if removed {
            tracing::info!(%role, account = %account, sender = %sender, "Role revoked");
        }
        Ok(removed)
    }

    /// Drop `caller`'s own membership of `role`. Needs no admin authority.
    pub fn renounce_role(&self, caller: &Principal, role: &RoleId) -> bool {
        let removed = self.remove(role, caller);
        if removed {
            tracing::info!(%role, account = %caller, "Role renounced");
        }
        removed
    }

    /// Make `admin_role` the administrator of `role`. `sender` must hold
    /// the current administrator role.
    pub fn set_role_admin(&self, sender: &Principal, role: &RoleId, admin_role: &RoleId) -> Result<()> {
        self.check_role(&self.role_admin(role), sender)?;
        self.write().admins.insert(*role, *admin_role);
        Ok(())
    }

    /// Number of principals holding `role`.
    #[must_use]
    pub fn member_count(&self, role: &RoleId) -> usize {
        self.read().members.get(role).map_or(0, HashSet::len)
    }

    fn remove(&self, role: &RoleId, account: &Principal) -> bool {
        self.write()
            .members
            .get_mut(role)
            .is_some_and(|set| set.remove(account))
    }

    fn read(&self) -> RwLockReadGuard<'_, Roles> {
        self.roles.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Roles> {
        self.roles.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AccessGate for RoleRegistry {
    fn has_role(&self, role: &RoleId, principal: &Principal) -> bool {
        self.read()
            .members
            .get(role)
            .is_some_and(|set| set.contains(principal))
    }

    fn grant_role(&self, role: &RoleId, principal: &Principal) {
        self.write().members.entry(*role).or_default().insert(*principal);
    }
}
