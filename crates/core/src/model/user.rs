use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::UserId;

/// The signed-in user as reported by the identity collaborator.
///
/// Session changes arrive asynchronously; consumers hold a watch on the
/// session context rather than reading a global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<Url>,
}

impl UserProfile {
    /// Name to greet the user with: display name, else the email local part.
    #[must_use]
    pub fn short_name(&self) -> &str {
        if let Some(name) = self.display_name.as_deref() {
            return name;
        }
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_falls_back_to_email_local_part() {
        let profile = UserProfile {
            id: UserId::new("uid-1").unwrap(),
            email: "ada@example.org".into(),
            display_name: None,
            photo_url: None,
        };
        assert_eq!(profile.short_name(), "ada");

        let named = UserProfile {
            display_name: Some("Ada".into()),
            ..profile
        };
        assert_eq!(named.short_name(), "Ada");
    }
}
