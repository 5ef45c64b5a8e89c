//! Registration, sign-in and account lookups.

use crate::config::AccountConfig;
use crate::constants::notices;
use crate::error::{AuthError, Result};
use crate::password::Passwords;
use bookings_core::repository::RepoFuture;
use bookings_core::{
    Account, Form, NewAccount, RepositoryError, Reservation, SharedRepository, UserId,
};
use std::collections::HashMap;
use std::time::Duration;

async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    call: RepoFuture<'_, T>,
) -> std::result::Result<T, BoundedError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(BoundedError::Repository),
        Err(_) => {
            tracing::warn!(operation, timeout = ?limit, "Account storage call timed out");
            Err(BoundedError::Timeout(operation))
        }
    }
}

enum BoundedError {
    Repository(RepositoryError),
    Timeout(&'static str),
}

impl From<BoundedError> for AuthError {
    fn from(error: BoundedError) -> Self {
        match error {
            BoundedError::Repository(e) => Self::from(e),
            BoundedError::Timeout(operation) => Self::Timeout { operation },
        }
    }
}

/// Validate a registration form.
///
/// All four fields are required, the first name and password have minimum
/// lengths, the email must look like an address and the password must mix
/// character classes.
#[must_use]
pub fn validate_registration(form: &mut Form, config: &AccountConfig) -> bool {
    form.required(&["first_name", "last_name", "email", "password"]);
    form.min_length("first_name", config.min_name_length);
    form.min_length("password", config.min_password_length);
    form.is_email("email");
    form.password_strength("password");
    form.valid()
}

fn email_taken(mut form: Form) -> AuthError {
    form.errors_mut().add("email", notices::EMAIL_TAKEN);
    AuthError::DuplicateEmail(Box::new(form))
}

/// Account operations over the shared repository.
#[derive(Clone)]
pub struct AccountService {
    repo: SharedRepository,
    passwords: Passwords,
    config: AccountConfig,
}

impl AccountService {
    /// Create the service.
    ///
    /// # Errors
    ///
    /// [`AuthError::Hashing`] if the configured hashing cost is invalid.
    pub fn new(repo: SharedRepository, config: AccountConfig) -> Result<Self> {
        Ok(Self {
            repo,
            passwords: Passwords::new(config.hashing)?,
            config,
        })
    }

    /// Register an account from submitted form values.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] if the form is invalid
    /// - [`AuthError::DuplicateEmail`] if the email is taken
    /// - [`AuthError::Repository`] / [`AuthError::Timeout`] from storage
    pub async fn register(&self, values: HashMap<String, String>) -> Result<UserId> {
        let mut form = Form::new(values);
        if !validate_registration(&mut form, &self.config) {
            return Err(AuthError::Validation(Box::new(form)));
        }

        let email = form.get("email").trim().to_string();
        let existing = bounded(
            "get_user_by_email",
            self.config.storage_timeout,
            self.repo.get_user_by_email(&email),
        )
        .await;
        match existing {
            Ok(_) => return Err(email_taken(form)),
            Err(BoundedError::Repository(RepositoryError::NotFound { .. })) => {}
            Err(e) => return Err(e.into()),
        }

        let account = NewAccount {
            first_name: form.get("first_name").trim().to_string(),
            last_name: form.get("last_name").trim().to_string(),
            email,
            password_hash: self.passwords.hash(form.get("password")).await?,
            access_level: self.config.access_level,
        };

        let created = bounded(
            "create_user",
            self.config.storage_timeout,
            self.repo.create_user(&account),
        )
        .await;
        match created {
            Ok(id) => {
                tracing::info!(user_id = %id, "Account registered");
                Ok(id)
            }
            // Lost a race with a concurrent registration.
            Err(BoundedError::Repository(RepositoryError::DuplicateEmail)) => {
                Err(email_taken(form))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check an email and password, returning the account id.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotFound`] if no account uses `email`
    /// - [`AuthError::Mismatch`] if the password is wrong
    /// - [`AuthError::Hashing`] if the stored hash is unreadable
    /// - [`AuthError::Repository`] / [`AuthError::Timeout`] from storage
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserId> {
        let email = email.trim();
        let found = bounded(
            "get_user_by_email",
            self.config.storage_timeout,
            self.repo.get_user_by_email(email),
        )
        .await;
        let account = match found {
            Ok(account) => account,
            Err(BoundedError::Repository(RepositoryError::NotFound { .. })) => {
                self.passwords.verify_decoy(password).await;
                tracing::debug!("Sign-in for unknown email");
                return Err(AuthError::NotFound);
            }
            Err(e) => return Err(e.into()),
        };

        if !self.passwords.verify(password, &account.password_hash).await? {
            tracing::debug!(user_id = %account.id, "Sign-in with wrong password");
            return Err(AuthError::Mismatch);
        }

        tracing::info!(user_id = %account.id, "Signed in");
        Ok(account.id)
    }

    /// Look up an account.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotFound`] for an unknown id
    /// - [`AuthError::Repository`] / [`AuthError::Timeout`] from storage
    pub async fn account(&self, id: UserId) -> Result<Account> {
        let found = bounded(
            "get_user_by_id",
            self.config.storage_timeout,
            self.repo.get_user_by_id(id),
        )
        .await;
        match found {
            Ok(account) => Ok(account),
            Err(BoundedError::Repository(RepositoryError::NotFound { .. })) => {
                Err(AuthError::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reservations booked under the account's email, ordered by start date.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotFound`] for an unknown id
    /// - [`AuthError::Repository`] / [`AuthError::Timeout`] from storage
    pub async fn booked_rooms(&self, id: UserId) -> Result<Vec<Reservation>> {
        let account = self.account(id).await?;
        Ok(bounded(
            "get_reservations_by_email",
            self.config.storage_timeout,
            self.repo.get_reservations_by_email(&account.email),
        )
        .await?)
    }
}
