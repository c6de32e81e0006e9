use std::sync::Arc;

use tracing::info;

use crate::auth::{AuthSession, SignupForm};
use crate::error::Alert;
use crate::screens::Route;

pub struct SignupScreen {
    session: Arc<AuthSession>,
    pub form: SignupForm,
    submitting: bool,
}

impl SignupScreen {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self {
            session,
            form: SignupForm::default(),
            submitting: false,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Creates the account and sends the user back to login with the
    /// account-created banner.
    pub async fn submit(&mut self) -> Result<Option<Route>, Alert> {
        if self.submitting {
            return Ok(None);
        }

        self.submitting = true;
        let result = self.session.sign_up(&self.form).await;
        self.submitting = false;

        let user = result?;
        info!(email = ?user.email, username = %self.form.username, "signup succeeded");
        Ok(Some(Route::Login {
            just_registered: true,
        }))
    }

    pub fn go_to_login(&self) -> Route {
        Route::Login {
            just_registered: false,
        }
    }
}
