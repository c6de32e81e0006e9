//! Backend error codes → user-facing messages, per flow.

use crate::backend::BackendError;
use crate::error::Alert;

pub const LOGIN_FAILED_TITLE: &str = "Login Failed";
pub const SIGNUP_FAILED_TITLE: &str = "Signup Failed";

pub fn login_failure_message(err: &BackendError) -> String {
    let known = match err.code.as_str() {
        "auth/user-not-found" => Some("No account found with this email address"),
        "auth/wrong-password" => Some("Incorrect password"),
        "auth/invalid-email" => Some("Invalid email address"),
        "auth/user-disabled" => Some("This account has been disabled"),
        "auth/too-many-requests" => Some("Too many failed attempts. Please try again later"),
        "auth/network-request-failed" => {
            Some("Network error. Please check your internet connection")
        }
        "auth/invalid-credential" => Some("Invalid email or password"),
        _ => None,
    };
    resolve(known, err, "Login failed. Please try again")
}

pub fn signup_failure_message(err: &BackendError) -> String {
    let known = match err.code.as_str() {
        "auth/email-already-in-use" => Some("An account with this email already exists"),
        "auth/invalid-email" => Some("Invalid email address"),
        "auth/operation-not-allowed" => Some("Email/password accounts are not enabled"),
        "auth/weak-password" => Some("Password is too weak. Please choose a stronger password"),
        "auth/network-request-failed" => {
            Some("Network error. Please check your internet connection")
        }
        "auth/too-many-requests" => Some("Too many attempts. Please try again later"),
        "permission-denied" => Some("Permission denied. Please check your Firestore rules"),
        "unavailable" => Some("Service temporarily unavailable. Please try again"),
        _ => None,
    };
    resolve(known, err, "Account creation failed. Please try again")
}

pub fn login_failure(err: &BackendError) -> Alert {
    Alert::new(LOGIN_FAILED_TITLE, login_failure_message(err))
}

pub fn signup_failure(err: &BackendError) -> Alert {
    Alert::new(SIGNUP_FAILED_TITLE, signup_failure_message(err))
}

/// Unmapped codes surface the backend's raw message, or `fallback` when
/// that is empty.
fn resolve(known: Option<&str>, err: &BackendError, fallback: &str) -> String {
    match known {
        Some(message) => message.to_string(),
        None if !err.message.trim().is_empty() => err.message.clone(),
        None => fallback.to_string(),
    }
}
