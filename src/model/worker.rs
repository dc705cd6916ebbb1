use std::collections::BTreeSet;

/// The authenticated employee a lifecycle operation acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worker {
    pub id: u64,
    /// Tenant the worker belongs to.
    pub company_id: u64,
    pub roles: BTreeSet<String>,
}

impl Worker {
    pub fn new<I, S>(id: u64, company_id: u64, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            company_id,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_role(&self, role_name: &str) -> bool {
        self.roles.contains(role_name)
    }
}
