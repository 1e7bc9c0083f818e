use std::path::Path;

use rowguard_core::{AppError, AppResult};
use rowguard_domain::{PermissionCatalog, ROOT_ROLE_NAME};

const CRUD: [(&str, &[&str]); 4] = [
    ("list", &["index", "show"]),
    ("create", &["create", "store"]),
    ("edit", &["edit", "update"]),
    ("delete", &["destroy"]),
];

/// Catalog of the admin application: one CRUD permission set per feature group.
pub fn builtin_catalog() -> PermissionCatalog {
    let groups = [
        ("User", "UserController", "user"),
        ("Role", "RoleController", "role"),
        ("Permission", "PermissionController", "permission"),
        ("Employee", "EmployeeController", "employee"),
        ("Enquiry", "EnquiryController", "enquiry"),
    ];

    let mut catalog = PermissionCatalog::new();
    for (group, controller, prefix) in groups {
        let names: Vec<(String, &[&str])> = CRUD
            .iter()
            .map(|(action, methods)| (format!("{prefix}-{action}"), *methods))
            .collect();
        catalog = catalog.with_group(
            group,
            controller,
            names
                .iter()
                .map(|(name, methods)| (name.as_str(), *methods)),
        );
    }

    catalog
        .with_role(ROOT_ROLE_NAME, Vec::<&str>::new())
        .with_role(
            "Admin",
            [
                "user-list",
                "user-create",
                "user-edit",
                "role-list",
                "role-create",
                "role-edit",
                "permission-list",
                "employee-list",
                "employee-create",
                "employee-edit",
                "employee-delete",
                "enquiry-list",
                "enquiry-edit",
                "enquiry-delete",
            ],
        )
        .with_role(
            "Staff",
            [
                "employee-list",
                "employee-create",
                "employee-edit",
                "enquiry-list",
                "enquiry-create",
            ],
        )
}

/// Loads the catalog from a JSON file, or the built-in catalog when no path is set.
pub fn load_catalog(path: Option<&Path>) -> AppResult<PermissionCatalog> {
    let Some(path) = path else {
        return Ok(builtin_catalog());
    };

    let contents = std::fs::read_to_string(path).map_err(|error| {
        AppError::Configuration(format!(
            "failed to read permission catalog '{}': {error}",
            path.display()
        ))
    })?;

    PermissionCatalog::from_json(contents.as_str())
}

#[cfg(test)]
mod tests {
    use super::{builtin_catalog, load_catalog};

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = builtin_catalog();

        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.permission_names().len(), 20);
        assert!(catalog.permission_names().contains("enquiry-delete"));
    }

    #[test]
    fn missing_path_falls_back_to_the_builtin_catalog() {
        assert_eq!(load_catalog(None).ok(), Some(builtin_catalog()));
    }

    #[test]
    fn unreadable_catalog_file_is_a_configuration_error() {
        let loaded = load_catalog(Some(std::path::Path::new(
            "/nonexistent/rowguard/catalog.json",
        )));

        assert!(matches!(
            loaded,
            Err(rowguard_core::AppError::Configuration(_))
        ));
    }
}
