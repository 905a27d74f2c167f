//! Permission resolution: an explicit fold over the candidate grants.
//!
//! Candidates are each role's permissions in role order, then the user's
//! direct permissions, so a personal grant refines role grants. Matching is
//! exact on scope and action; the merge is additive — later entries add
//! resource constraint values and fields, never replace them.

use super::AuthError;
use super::models::Permission;
use crate::entities::{Role, User};

/// Resolve the minimal effective permission for `(scope, action)` from the
/// user's roles and direct grants.
///
/// An empty candidate set after filtering is `Forbidden`.
pub fn resolve_permission(
    roles: &[Role],
    user: &User,
    scope: &str,
    action: &str,
) -> Result<Permission, AuthError> {
    let matching: Vec<&Permission> = roles
        .iter()
        .flat_map(|role| role.permissions.iter())
        .chain(user.permissions.iter())
        .filter(|permission| permission.scope == scope && permission.action == action)
        .collect();

    if matching.is_empty() {
        return Err(AuthError::Forbidden);
    }

    Ok(merge(&matching, scope, action))
}

/// Fold the matching grants into one effective permission. Per resource
/// field, values are appended and deduplicated; a grant without a resource
/// constraint contributes nothing to the constraint (it does not widen it).
fn merge(matching: &[&Permission], scope: &str, action: &str) -> Permission {
    let mut effective = Permission::new(scope, action);
    for permission in matching {
        let Some(fields) = &permission.resource else {
            continue;
        };
        let resource = effective.resource.get_or_insert_default();
        for (field, values) in fields {
            let allowed = resource.entry(field.clone()).or_default();
            for value in values {
                if !allowed.contains(value) {
                    allowed.push(value.clone());
                }
            }
        }
    }
    effective
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;

    fn user_with(permissions: Vec<Permission>) -> User {
        User {
            id: "USER1".to_string(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            email: "ops@example.com".to_string(),
            first_name: "Ops".to_string(),
            last_name: "User".to_string(),
            phone: "".to_string(),
            password_hash: None,
            permissions,
            role_ids: vec![],
            session_ids: vec![],
        }
    }

    fn role_with(name: &str, permissions: Vec<Permission>) -> Role {
        Role {
            id: name.to_string(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            name: name.to_string(),
            permissions,
        }
    }

    #[test]
    fn role_and_direct_grants_union_per_field() {
        let role = role_with(
            "inspector",
            vec![Permission::new("stops", "read").constrain("code", vec!["A"])],
        );
        let user = user_with(vec![
            Permission::new("stops", "read").constrain("code", vec!["B"]),
        ]);

        let effective = resolve_permission(&[role], &user, "stops", "read").unwrap();
        let resource = effective.resource.unwrap();
        assert_eq!(
            resource["code"],
            vec![Bson::from("A"), Bson::from("B")]
        );
    }

    #[test]
    fn duplicate_values_are_deduplicated() {
        let role = role_with(
            "inspector",
            vec![Permission::new("stops", "read").constrain("code", vec!["A"])],
        );
        let user = user_with(vec![
            Permission::new("stops", "read").constrain("code", vec!["A"]),
        ]);

        let effective = resolve_permission(&[role], &user, "stops", "read").unwrap();
        assert_eq!(effective.resource.unwrap()["code"], vec![Bson::from("A")]);
    }

    #[test]
    fn later_entries_add_fields_instead_of_replacing() {
        let role = role_with(
            "inspector",
            vec![Permission::new("stops", "read").constrain("code", vec!["A"])],
        );
        let user = user_with(vec![
            Permission::new("stops", "read").constrain("municipality_id", vec!["M1"]),
        ]);

        let effective = resolve_permission(&[role], &user, "stops", "read").unwrap();
        let resource = effective.resource.unwrap();
        assert_eq!(resource.len(), 2);
        assert_eq!(resource["code"], vec![Bson::from("A")]);
        assert_eq!(resource["municipality_id"], vec![Bson::from("M1")]);
    }

    #[test]
    fn non_matching_scope_or_action_is_forbidden() {
        let role = role_with(
            "inspector",
            vec![Permission::new("stops", "read")],
        );
        let user = user_with(vec![]);

        assert!(matches!(
            resolve_permission(&[role], &user, "stops", "write"),
            Err(AuthError::Forbidden)
        ));
    }

    #[test]
    fn unconstrained_grants_merge_to_an_unconstrained_permission() {
        let user = user_with(vec![Permission::new("stops", "read")]);
        let effective = resolve_permission(&[], &user, "stops", "read").unwrap();
        assert!(effective.resource.is_none());
    }
}
