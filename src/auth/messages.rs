use std::fmt;

use crate::client::ApiError;

/// The fixed set of sign-in outcomes the login form can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInFailure {
    EmailNotVerified,
    InvalidCredentials,
    AccountDisabled,
    UnknownAccount,
    Unknown,
}

impl SignInFailure {
    pub fn message(&self) -> &'static str {
        match self {
            SignInFailure::EmailNotVerified => {
                "Email not verified. Please check your inbox for the verification link."
            }
            SignInFailure::InvalidCredentials => "Invalid email or password",
            SignInFailure::AccountDisabled => {
                "Your account has been disabled. Please contact support."
            }
            SignInFailure::UnknownAccount => "No account found with this email address",
            SignInFailure::Unknown => "Unable to sign in. Please try again.",
        }
    }

    /// Map a failed login call onto a user-facing outcome by its server detail.
    pub fn classify(error: &ApiError) -> Self {
        let Some(detail) = error.detail() else {
            return SignInFailure::Unknown;
        };
        let detail = detail.to_lowercase();
        let has = |needle: &str| detail.contains(&needle.to_lowercase());

        if has("Email verification required") || has("UserNotConfirmedException") {
            SignInFailure::EmailNotVerified
        } else if has("Invalid username or password")
            || has("Incorrect username or password")
            || has("NotAuthorizedException")
        {
            SignInFailure::InvalidCredentials
        } else if has("Account is disabled") || has("disabled") {
            SignInFailure::AccountDisabled
        } else if has("UserNotFoundException") || has("User not found") {
            SignInFailure::UnknownAccount
        } else {
            SignInFailure::Unknown
        }
    }
}

impl fmt::Display for SignInFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
