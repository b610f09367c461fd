use std::fmt;

/// Identifier of an outbox record. Assigned by the store at insert time and
/// strictly increasing, so it doubles as the delivery order.
pub type OutboxId = i64;

/// Deployment tag stamped on every published record, fixed for the lifetime
/// of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Environment(String);

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new("Local")
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
