//! Actors and their optional capability facets.
//!
//! An actor is anything with an [`OwnerRef`] identity that tries to decide
//! an approval step. Hosts plug their own account types in by implementing
//! [`Actor`]; the two facets are exposed through accessor methods so the
//! evaluator can ask "does this actor support X?" without reflection.

use std::collections::HashSet;

use crate::models::owner::OwnerRef;

/// Capability of actors that initiate transfers: they can prove ownership.
pub trait OwnershipCheck {
    /// Whether the actor currently owns `license_id`.
    fn owns_license(&self, license_id: &str) -> bool;
}

/// Capability of actors backed by a permission system.
pub trait PermissionCheck {
    /// Whether the actor holds `permission`.
    fn has_permission(&self, permission: &str) -> bool;
}

/// An entity attempting to approve or reject a step.
pub trait Actor: Send + Sync {
    /// Polymorphic identity of the actor.
    fn identity(&self) -> &OwnerRef;

    /// Ownership facet, when the actor initiates transfers.
    fn ownership(&self) -> Option<&dyn OwnershipCheck> {
        None
    }

    /// Permission facet, when the actor is subject to permission checks.
    fn permissions(&self) -> Option<&dyn PermissionCheck> {
        None
    }
}

/// In-memory actor with explicit capabilities.
///
/// Used by the CLI and by hosts that resolve ownership and permissions up
/// front rather than lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    identity: OwnerRef,
    owned_licenses: Option<OwnedLicenses>,
    permissions: Option<GrantedPermissions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OwnedLicenses(HashSet<String>);

impl OwnershipCheck for OwnedLicenses {
    fn owns_license(&self, license_id: &str) -> bool {
        self.0.contains(license_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct GrantedPermissions(HashSet<String>);

impl PermissionCheck for GrantedPermissions {
    fn has_permission(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }
}

impl Principal {
    /// Actor with identity only and no capability facets.
    #[must_use]
    pub fn new(identity: OwnerRef) -> Self {
        Self {
            identity,
            owned_licenses: None,
            permissions: None,
        }
    }

    /// Enable the ownership facet without any owned licenses.
    #[must_use]
    pub fn initiator(mut self) -> Self {
        self.owned_licenses.get_or_insert_with(OwnedLicenses::default);
        self
    }

    /// Enable the ownership facet and record `license_id` as owned.
    #[must_use]
    pub fn owning(mut self, license_id: impl Into<String>) -> Self {
        self.owned_licenses
            .get_or_insert_with(OwnedLicenses::default)
            .0
            .insert(license_id.into());
        self
    }

    /// Enable the permission facet and grant `permission`.
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions
            .get_or_insert_with(GrantedPermissions::default)
            .0
            .insert(permission.into());
        self
    }

    /// Enable the permission facet without granting anything.
    #[must_use]
    pub fn permission_checked(mut self) -> Self {
        self.permissions.get_or_insert_with(GrantedPermissions::default);
        self
    }
}

impl Actor for Principal {
    fn identity(&self) -> &OwnerRef {
        &self.identity
    }

    fn ownership(&self) -> Option<&dyn OwnershipCheck> {
        self.owned_licenses
            .as_ref()
            .map(|owned| owned as &dyn OwnershipCheck)
    }

    fn permissions(&self) -> Option<&dyn PermissionCheck> {
        self.permissions
            .as_ref()
            .map(|granted| granted as &dyn PermissionCheck)
    }
}
