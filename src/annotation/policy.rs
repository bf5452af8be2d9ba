//! Authorization policy for annotation actions.
//!
//! An explicit, non-empty permission entry for the action is authoritative:
//! only listed identities (or anyone, when [`EVERYONE`] is listed) pass.
//! Without one, reads are open to all and updates/deletes are reserved to
//! the owner. A record with no owner can be changed by anyone.

use super::models::{Action, Annotation, EVERYONE};

/// Decide whether `user` may perform `action` on `annotation`.
///
/// `user` is `None` only when authentication is disabled and the request
/// asserted no identity.
pub fn authorise(annotation: &Annotation, action: Action, user: Option<&str>) -> bool {
    let entry = annotation
        .permissions
        .as_ref()
        .and_then(|p| p.entry(action));

    if let Some(allowed) = entry {
        return allowed
            .iter()
            .any(|u| u == EVERYONE || Some(u.as_str()) == user);
    }

    match action {
        Action::Read => true,
        Action::Update | Action::Delete => match annotation.user.as_deref() {
            None => true,
            Some(owner) => user == Some(owner),
        },
    }
}

/// Keep only the annotations `user` may read, preserving order.
pub fn readable(annotations: Vec<Annotation>, user: Option<&str>) -> Vec<Annotation> {
    annotations
        .into_iter()
        .filter(|a| authorise(a, Action::Read, user))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::models::Permissions;

    fn owned_by(owner: &str) -> Annotation {
        Annotation {
            user: Some(owner.to_string()),
            ..Annotation::default()
        }
    }

    fn with_entry(owner: &str, action: Action, users: &[&str]) -> Annotation {
        let mut perms = Permissions::default();
        perms.set(action, users.iter().map(|u| u.to_string()).collect());
        Annotation {
            permissions: Some(perms),
            ..owned_by(owner)
        }
    }

    #[test]
    fn test_default_read_is_open() {
        let ann = owned_by("alice");
        assert!(authorise(&ann, Action::Read, Some("bob")));
        assert!(authorise(&ann, Action::Read, None));
    }

    #[test]
    fn test_default_mutation_is_owner_only() {
        let ann = owned_by("alice");
        for action in [Action::Update, Action::Delete] {
            assert!(authorise(&ann, action, Some("alice")));
            assert!(!authorise(&ann, action, Some("bob")));
            assert!(!authorise(&ann, action, None));
        }
    }

    #[test]
    fn test_unowned_record_is_mutable_by_anyone() {
        let ann = Annotation::with_text("legacy");
        assert!(authorise(&ann, Action::Update, Some("bob")));
        assert!(authorise(&ann, Action::Delete, None));
    }

    #[test]
    fn test_explicit_entry_restricts() {
        let ann = with_entry("alice", Action::Read, &["bob"]);
        assert!(authorise(&ann, Action::Read, Some("bob")));
        assert!(!authorise(&ann, Action::Read, Some("alice")));
        assert!(!authorise(&ann, Action::Read, None));
    }

    #[test]
    fn test_explicit_entry_can_grant_non_owner() {
        let ann = with_entry("alice", Action::Update, &["bob"]);
        assert!(authorise(&ann, Action::Update, Some("bob")));
        assert!(!authorise(&ann, Action::Update, Some("carol")));
        // delete still falls back to owner-only
        assert!(!authorise(&ann, Action::Delete, Some("bob")));
        assert!(authorise(&ann, Action::Delete, Some("alice")));
    }

    #[test]
    fn test_everyone_sentinel() {
        let ann = with_entry("alice", Action::Delete, &[EVERYONE]);
        assert!(authorise(&ann, Action::Delete, Some("mallory")));
        assert!(authorise(&ann, Action::Delete, None));
    }

    #[test]
    fn test_empty_entry_falls_back_to_default() {
        let ann = with_entry("alice", Action::Update, &[]);
        assert!(authorise(&ann, Action::Update, Some("alice")));
        assert!(!authorise(&ann, Action::Update, Some("bob")));
    }

    #[test]
    fn test_readable_filters_each_record() {
        let open = owned_by("alice");
        let private = with_entry("alice", Action::Read, &["alice"]);
        let shared = with_entry("alice", Action::Read, &["bob", "alice"]);

        let seen = readable(vec![open.clone(), private.clone(), shared.clone()], Some("bob"));
        assert_eq!(seen, vec![open.clone(), shared.clone()]);

        for ann in &seen {
            assert!(authorise(ann, Action::Read, Some("bob")));
        }
        assert_eq!(readable(vec![open, private, shared], Some("alice")).len(), 3);
    }
}
