mod assignments;
mod repositories;
mod roles;

pub use assignments::PrincipalAssignments;
pub use repositories::{AssignmentRepository, RoleRepository};
pub use roles::{CreateRoleInput, PermissionGroupDefinition, RoleDefinition};
