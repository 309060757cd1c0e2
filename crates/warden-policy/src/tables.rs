//! The fixed role → permission table.
//!
//! Compiled into the binary. Changing a grant is a redeploy.

use warden_contracts::actor::{Permission, Role};

/// Includes `ModifyState` so developers can run `materialize_actions`, which
/// writes queued actions out as artifacts.
const DEVELOPER: &[Permission] = &[
    Permission::CreateArtifacts,
    Permission::RunModelPrompts,
    Permission::UpdateStreams,
    Permission::ViewExecutionQueue,
    Permission::ViewDashboards,
    Permission::ViewStreams,
    Permission::ViewArtifacts,
    Permission::ModifyState,
];

const VIEWER: &[Permission] = &[
    Permission::ViewDashboards,
    Permission::ViewStreams,
    Permission::ViewArtifacts,
];

/// Every permission granted to `role`. Never empty.
pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::Admin => &Permission::ALL,
        Role::Developer => DEVELOPER,
        Role::Viewer => VIEWER,
    }
}

/// True if any of `roles` grants `permission`.
pub fn roles_grant(roles: &[Role], permission: Permission) -> bool {
    roles
        .iter()
        .any(|role| permissions_for(*role).contains(&permission))
}
