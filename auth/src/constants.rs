//! Account constants.
//!
//! Notices shown to visitors after account actions.

/// One-shot notices stored in the session after account actions.
pub mod notices {
    /// Shown on the login page after a successful registration.
    pub const REGISTERED: &str = "Register successfully, you can login now.";

    /// Shown after a successful sign-in.
    pub const LOGGED_IN: &str = "Logged in successfully.";

    /// Shown after a failed sign-in, whichever of email or password was wrong.
    pub const INVALID_CREDENTIALS: &str =
        "Unauthorized user, check if your email and/or password is correct";

    /// Field error placed on `email` when the address is taken.
    pub const EMAIL_TAKEN: &str = "Email already registered";
}
