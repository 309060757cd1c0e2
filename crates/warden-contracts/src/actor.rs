//! Actor identity and the closed role / permission vocabularies.
//!
//! Actors are owned by an external identity store. The guardrail engine only
//! reads them: it never creates, authenticates, or mutates an actor beyond
//! stamping its last-activity time through the directory that owns it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier for an actor (e.g. `ActorId("user_001")`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named bundle of permissions. The set is closed; adding a role is a
/// redeploy, not a runtime mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Developer,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Developer, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Developer => "developer",
            Role::Viewer => "viewer",
        }
    }
}

/// A capability gating one class of sensitive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ExecuteCommands,
    ModifySchemas,
    ViewLogs,
    ManageActors,
    CreateArtifacts,
    RunModelPrompts,
    UpdateStreams,
    ViewExecutionQueue,
    ViewDashboards,
    ViewStreams,
    ViewArtifacts,
    DeleteData,
    ModifyState,
}

impl Permission {
    pub const ALL: [Permission; 13] = [
        Permission::ExecuteCommands,
        Permission::ModifySchemas,
        Permission::ViewLogs,
        Permission::ManageActors,
        Permission::CreateArtifacts,
        Permission::RunModelPrompts,
        Permission::UpdateStreams,
        Permission::ViewExecutionQueue,
        Permission::ViewDashboards,
        Permission::ViewStreams,
        Permission::ViewArtifacts,
        Permission::DeleteData,
        Permission::ModifyState,
    ];

    /// The snake_case name used in audit metadata and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ExecuteCommands => "execute_commands",
            Permission::ModifySchemas => "modify_schemas",
            Permission::ViewLogs => "view_logs",
            Permission::ManageActors => "manage_actors",
            Permission::CreateArtifacts => "create_artifacts",
            Permission::RunModelPrompts => "run_model_prompts",
            Permission::UpdateStreams => "update_streams",
            Permission::ViewExecutionQueue => "view_execution_queue",
            Permission::ViewDashboards => "view_dashboards",
            Permission::ViewStreams => "view_streams",
            Permission::ViewArtifacts => "view_artifacts",
            Permission::DeleteData => "delete_data",
            Permission::ModifyState => "modify_state",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated identity attempting an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    /// Contact handle (e-mail or similar), copied into every audit event.
    pub handle: String,
    /// Assigned roles, in assignment order. Duplicates are harmless.
    pub roles: Vec<Role>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl Actor {
    /// Build an active actor created now.
    pub fn new(id: impl Into<String>, handle: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            id: ActorId::new(id),
            handle: handle.into(),
            roles,
            active: true,
            created_at: Utc::now(),
            last_active_at: None,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
