use crate::model::{Identity, Role};

/// Operator-configured emails that are always administrators.
/// Entries are stored trimmed and lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    emails: Vec<String>,
}

impl AdminAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut emails: Vec<String> = emails
            .into_iter()
            .map(|e| normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        emails.sort();
        emails.dedup();
        Self { emails }
    }

    /// Parse a comma-separated list, e.g. `"a@x.edu, b@x.edu"`.
    pub fn parse(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    pub fn contains(&self, email: &str) -> bool {
        let needle = normalize(email);
        self.emails.binary_search(&needle).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Two-tier admin resolution.
///
/// 1. Allow-list membership wins over anything stored.
/// 2. Otherwise the stored role is used; no stored record means student.
pub fn resolve_role(identity: &Identity, allow_list: &AdminAllowList, stored: Option<Role>) -> Role {
    if allow_list.contains(&identity.email) {
        return Role::Admin;
    }
    stored.unwrap_or_default()
}

/// Role written into a freshly created user record.
pub fn initial_role(email: &str, allow_list: &AdminAllowList) -> Role {
    if allow_list.contains(email) {
        Role::Admin
    } else {
        Role::Student
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str) -> Identity {
        Identity {
            uid: "uid-1".into(),
            email: email.into(),
        }
    }

    #[test]
    fn allow_list_beats_stored_role() {
        let list = AdminAllowList::parse("admin@x.edu");
        let role = resolve_role(&identity("Admin@X.edu"), &list, Some(Role::Student));
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn stored_admin_kept_when_not_listed() {
        let list = AdminAllowList::parse("admin@x.edu");
        let role = resolve_role(&identity("other@x.edu"), &list, Some(Role::Admin));
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn defaults_to_student() {
        let list = AdminAllowList::default();
        assert_eq!(resolve_role(&identity("a@x.edu"), &list, None), Role::Student);
        assert_eq!(
            resolve_role(&identity("a@x.edu"), &list, Some(Role::Student)),
            Role::Student
        );
    }

    #[test]
    fn parse_trims_and_skips_blanks() {
        let list = AdminAllowList::parse(" One@X.edu , ,two@x.edu,one@x.edu ");
        assert_eq!(list.len(), 2);
        assert!(list.contains("one@x.edu"));
        assert!(list.contains("  TWO@x.edu"));
        assert!(!list.contains("three@x.edu"));
        assert!(AdminAllowList::parse("").is_empty());
    }

    #[test]
    fn initial_role_follows_allow_list() {
        let list = AdminAllowList::parse("admin@x.edu");
        assert_eq!(initial_role("ADMIN@x.edu", &list), Role::Admin);
        assert_eq!(initial_role("student@x.edu", &list), Role::Student);
    }
}
