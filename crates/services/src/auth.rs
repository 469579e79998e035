use tokio::sync::watch;

use spacey_core::model::UserProfile;

/// Owner of the signed-in-user state, created once at the application root.
///
/// The identity collaborator pushes session changes through `set_user` /
/// `clear`; everything that needs the current user holds a [`SessionWatch`]
/// handed down explicitly. No ambient singleton.
#[derive(Debug)]
pub struct SessionContext {
    tx: watch::Sender<Option<UserProfile>>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Record a sign-in (or profile refresh) pushed by the identity provider.
    pub fn set_user(&self, profile: UserProfile) {
        let _ = self.tx.send(Some(profile));
    }

    /// Record a sign-out.
    pub fn clear(&self) {
        let _ = self.tx.send(None);
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn watch(&self) -> SessionWatch {
        SessionWatch {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Read handle onto the session state. Cheap to clone and pass around.
#[derive(Debug, Clone)]
pub struct SessionWatch {
    rx: watch::Receiver<Option<UserProfile>>,
}

impl SessionWatch {
    /// Snapshot of the current user, if signed in.
    #[must_use]
    pub fn current(&self) -> Option<UserProfile> {
        self.rx.borrow().clone()
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait until the session state changes again.
    ///
    /// Returns `false` once the root `SessionContext` has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
