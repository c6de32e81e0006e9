use std::sync::Arc;

use tracing::info;

use crate::auth::{AuthSession, LoginForm};
use crate::error::Alert;
use crate::screens::Route;

pub const ACCOUNT_CREATED_BANNER: &str = "Account created successfully! Welcome aboard.";

pub struct LoginScreen {
    session: Arc<AuthSession>,
    pub form: LoginForm,
    banner: Option<String>,
    submitting: bool,
}

impl LoginScreen {
    pub fn new(session: Arc<AuthSession>, just_registered: bool) -> Self {
        Self {
            session,
            form: LoginForm::default(),
            banner: just_registered.then(|| ACCOUNT_CREATED_BANNER.to_string()),
            submitting: false,
        }
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Signs in with the form contents. Ignored while a submission is
    /// running.
    pub async fn submit(&mut self) -> Result<Option<Route>, Alert> {
        if self.submitting {
            return Ok(None);
        }

        self.submitting = true;
        let result = self.session.sign_in(&self.form).await;
        self.submitting = false;

        let user = result?;
        info!(email = ?user.email, "login succeeded");
        Ok(Some(Route::Home))
    }

    pub fn go_to_signup(&self) -> Route {
        Route::Signup
    }
}
