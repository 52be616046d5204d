//! Read-only view of a platform user account.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAccount {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
}

impl UserAccount {
    /// Name used to seed the affiliate code: the display name, or the local
    /// part of the email address.
    pub fn preferred_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}
