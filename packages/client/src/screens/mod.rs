//! Screen view-models.
//!
//! Each screen owns its state and exposes the user actions. Nothing is
//! rendered here; navigation is expressed as [`Route`] intents and
//! background failures are queued as [`Notices`].

pub mod favorites;
pub mod home;
pub mod login;
pub mod profile;
pub mod signup;

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Alert;

pub use favorites::FavoritesScreen;
pub use home::HomeScreen;
pub use login::LoginScreen;
pub use profile::{ProfileScreen, ProfileStatus};
pub use signup::SignupScreen;

/// Navigation intent emitted by a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `just_registered` shows the account-created banner.
    Login { just_registered: bool },
    Signup,
    Home,
    Favorites,
    Profile,
    Back,
}

/// Queue of dismissible notifications raised outside a direct user action.
#[derive(Clone, Default)]
pub struct Notices {
    queue: Arc<Mutex<VecDeque<Alert>>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, alert: Alert) {
        self.queue.lock().push_back(alert);
    }

    /// The oldest notice still shown.
    pub fn current(&self) -> Option<Alert> {
        self.queue.lock().front().cloned()
    }

    pub fn dismiss(&self) -> Option<Alert> {
        self.queue.lock().pop_front()
    }

    pub fn drain(&self) -> Vec<Alert> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_are_dismissed_in_order() {
        let notices = Notices::new();
        notices.push(Alert::error("first"));
        notices.clone().push(Alert::error("second"));

        assert_eq!(notices.len(), 2);
        assert_eq!(notices.current().map(|a| a.message), Some("first".into()));
        notices.dismiss();
        assert_eq!(notices.drain(), vec![Alert::error("second")]);
        assert!(notices.is_empty());
    }
}
