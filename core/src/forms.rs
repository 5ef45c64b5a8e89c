//! Form validation.
//!
//! A [`Form`] wraps the submitted field values and accumulates per-field
//! error messages. Every rule runs regardless of earlier failures, and
//! [`FormErrors::get`] reports the first message recorded for a field so
//! views can show one line per input.
//!
//! [`Form::min_length`], [`Form::is_email`] and [`Form::password_strength`]
//! record [`MSG_FIELD_NOT_FOUND`] for an absent or blank field instead of
//! judging an empty value.
//!
//! # Example
//!
//! ```
//! use bookings_core::forms::Form;
//!
//! let mut form = Form::from_pairs([("first_name", "Jo"), ("email", "notanemail")]);
//! form.required(&["first_name", "last_name", "email"]);
//! form.min_length("first_name", 3);
//! form.is_email("email");
//!
//! assert!(!form.valid());
//! assert_eq!(form.errors().get("last_name"), Some("This field cannot be blank"));
//! assert_eq!(form.errors().get("email"), Some("Invalid email address"));
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};

/// Message recorded by [`Form::required`].
pub const MSG_REQUIRED: &str = "This field cannot be blank";
/// Message recorded by [`Form::is_email`].
pub const MSG_INVALID_EMAIL: &str = "Invalid email address";
/// Message recorded when a validator's field is absent or blank.
pub const MSG_FIELD_NOT_FOUND: &str = "This field was not found to validate";
/// Message recorded for a password without an uppercase letter.
pub const MSG_PASSWORD_UPPERCASE: &str = "Password must contain at least one uppercase letter";
/// Message recorded for a password without a digit.
pub const MSG_PASSWORD_DIGIT: &str = "Password must contain at least one number";
/// Message recorded for a password without a lowercase letter.
pub const MSG_PASSWORD_LOWERCASE: &str = "Password must contain at least one lowercase letter";
/// Message recorded for a password without a symbol.
pub const MSG_PASSWORD_SYMBOL: &str = "Password must contain at least one special character";

/// Message recorded by [`Form::min_length`].
#[must_use]
pub fn min_length_message(n: usize) -> String {
    format!("This field must be at least {n} characters long")
}

/// Accumulated validation messages, keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormErrors(BTreeMap<String, SmallVec<[String; 2]>>);

impl FormErrors {
    /// Record a message for `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// The first message recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    /// Every message recorded for `field`, in insertion order.
    #[must_use]
    pub fn messages(&self, field: &str) -> &[String] {
        match self.0.get(field) {
            Some(messages) => messages.as_slice(),
            None => &[],
        }
    }

    /// Number of fields carrying at least one message.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when no field has an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(field, first message)` pairs in field order.
    pub fn first_messages(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().filter_map(|(field, messages)| {
            messages
                .first()
                .map(|message| (field.as_str(), message.as_str()))
        })
    }
}

/// Submitted form values plus the errors found in them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    values: HashMap<String, String>,
    errors: FormErrors,
}

impl Form {
    /// Wrap decoded form values.
    #[must_use]
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values,
            errors: FormErrors::default(),
        }
    }

    /// Build a form from literal pairs. Mostly useful in tests.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The submitted value for `field`, or `""` if it was not submitted.
    #[must_use]
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map_or("", String::as_str)
    }

    /// Whether `field` was submitted with a non-blank value.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        !self.get(field).trim().is_empty()
    }

    /// Record [`MSG_REQUIRED`] for each field that is absent or blank.
    pub fn required(&mut self, fields: &[&str]) {
        for field in fields {
            if !self.has(field) {
                self.errors.add(*field, MSG_REQUIRED);
            }
        }
    }

    /// Record [`MSG_FIELD_NOT_FOUND`] and return `false` when `field` is
    /// absent or blank.
    fn present(&mut self, field: &str) -> bool {
        if self.has(field) {
            return true;
        }
        self.errors.add(field, MSG_FIELD_NOT_FOUND);
        false
    }

    /// Record a length error if `field` is shorter than `n` characters.
    /// Returns `true` when the rule holds.
    pub fn min_length(&mut self, field: &str, n: usize) -> bool {
        if !self.present(field) {
            return false;
        }
        if self.get(field).chars().count() < n {
            self.errors.add(field, min_length_message(n));
            return false;
        }
        true
    }

    /// Record [`MSG_INVALID_EMAIL`] unless `field` is a plausible address.
    ///
    /// Returns `true` when the rule holds.
    pub fn is_email(&mut self, field: &str) -> bool {
        if !self.present(field) {
            return false;
        }
        if is_valid_email(self.get(field).trim()) {
            return true;
        }
        self.errors.add(field, MSG_INVALID_EMAIL);
        false
    }

    /// Require an uppercase letter, a digit, a lowercase letter and a
    /// symbol, checked in that order. Only the first missing class is
    /// recorded.
    ///
    /// Returns `true` when every class is present.
    pub fn password_strength(&mut self, field: &str) -> bool {
        if !self.present(field) {
            return false;
        }

        let checks: [(fn(char) -> bool, &str); 4] = [
            (|c| c.is_ascii_uppercase(), MSG_PASSWORD_UPPERCASE),
            (|c| c.is_ascii_digit(), MSG_PASSWORD_DIGIT),
            (|c| c.is_ascii_lowercase(), MSG_PASSWORD_LOWERCASE),
            (|c| !(c.is_ascii_alphanumeric() || c == '_'), MSG_PASSWORD_SYMBOL),
        ];
        let value = self.get(field);
        let missing = checks
            .into_iter()
            .find(|(class, _)| !value.chars().any(class));

        match missing {
            Some((_, message)) => {
                self.errors.add(field, message);
                false
            }
            None => true,
        }
    }

    /// `true` when no validator has recorded an error.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors recorded so far.
    #[must_use]
    pub const fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Mutable access, for errors found outside the validators
    /// (e.g. an email already taken).
    pub fn errors_mut(&mut self) -> &mut FormErrors {
        &mut self.errors
    }

    /// Submitted values.
    #[must_use]
    pub const fn values(&self) -> &HashMap<String, String> {
        &self.values
    }

    /// Forget the submitted value of `field`, keeping its errors. Used to
    /// keep passwords out of re-rendered forms.
    pub fn redact(&mut self, field: &str) {
        self.values.remove(field);
    }
}

/// Minimal structural email check.
///
/// Requires exactly one `@`, a non-empty local part of letters, digits and
/// `.-+_`, and a dotted domain without empty labels.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    let valid_local = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    local.chars().all(valid_local)
        && domain.contains('.')
        && domain.chars().all(valid_domain)
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn redact_keeps_errors() {
        let mut form = Form::from_pairs([("password", "short")]);
        form.password_strength("password");
        form.redact("password");

        assert_eq!(form.get("password"), "");
        assert!(!form.valid());
    }

    #[test]
    fn required_reports_each_blank_field() {
        let mut form = Form::from_pairs([("a", "x"), ("b", "   ")]);
        form.required(&["a", "b", "c"]);

        assert!(!form.valid());
        assert_eq!(form.errors().len(), 2);
        assert_eq!(form.errors().get("a"), None);
        assert_eq!(form.errors().get("b"), Some(MSG_REQUIRED));
        assert_eq!(form.errors().get("c"), Some(MSG_REQUIRED));
    }

    #[test]
    fn min_length_reports_absent_and_blank_fields_as_not_found() {
        let mut form = Form::from_pairs([("name", "Jo"), ("blank", "   ")]);
        assert!(!form.min_length("missing", 3));
        assert!(!form.min_length("blank", 3));
        assert_eq!(form.errors().messages("missing"), [MSG_FIELD_NOT_FOUND]);
        assert_eq!(form.errors().messages("blank"), [MSG_FIELD_NOT_FOUND]);

        assert!(!form.min_length("name", 3));
        assert_eq!(
            form.errors().get("name"),
            Some("This field must be at least 3 characters long")
        );
    }

    #[test]
    fn min_length_counts_characters_not_bytes() {
        let mut form = Form::from_pairs([("name", "Zoë")]);
        assert!(form.min_length("name", 3));
        assert!(form.valid());
    }

    #[test]
    fn first_message_wins() {
        let mut form = Form::from_pairs([("email", "")]);
        form.required(&["email"]);
        form.is_email("email");

        assert_eq!(form.errors().get("email"), Some(MSG_REQUIRED));
        assert_eq!(
            form.errors().messages("email"),
            [MSG_REQUIRED, MSG_FIELD_NOT_FOUND]
        );
    }

    #[test]
    fn is_email_reports_absent_and_blank_fields_as_not_found() {
        let mut form = Form::from_pairs([("blank", " ")]);
        assert!(!form.is_email("email"));
        assert!(!form.is_email("blank"));

        assert_eq!(form.errors().messages("email"), [MSG_FIELD_NOT_FOUND]);
        assert_eq!(form.errors().messages("blank"), [MSG_FIELD_NOT_FOUND]);
    }

    #[test]
    fn is_email_rejects_malformed_address() {
        let mut form = Form::from_pairs([("email", "notanemail")]);
        assert!(!form.is_email("email"));
        assert_eq!(form.errors().messages("email"), [MSG_INVALID_EMAIL]);
    }

    #[test]
    fn email_rules() {
        for good in ["me@here.com", "first.last+tag@mail.example.org"] {
            assert!(is_valid_email(good), "{good} should be valid");
        }
        for bad in ["notanemail", "a@b", "@here.com", "me@", "me@@here.com", "me@here..com"] {
            assert!(!is_valid_email(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn password_strength_reports_only_the_first_missing_class() {
        let cases = [
            ("abc", MSG_PASSWORD_UPPERCASE),
            ("Abc", MSG_PASSWORD_DIGIT),
            ("ABC1", MSG_PASSWORD_LOWERCASE),
            ("Abc1", MSG_PASSWORD_SYMBOL),
        ];
        for (password, expected) in cases {
            let mut form = Form::from_pairs([("password", password)]);
            assert!(!form.password_strength("password"), "{password}");
            assert_eq!(form.errors().messages("password"), [expected], "{password}");
        }
    }

    #[test]
    fn password_strength_accepts_strong_password() {
        let mut form = Form::from_pairs([("password", "Secret1!")]);
        assert!(form.password_strength("password"));
        assert!(form.valid());
    }

    #[test]
    fn password_strength_distinguishes_missing_field() {
        let mut form = Form::from_pairs([("blank", "")]);
        assert!(!form.password_strength("password"));
        assert!(!form.password_strength("blank"));
        assert_eq!(form.errors().messages("password"), [MSG_FIELD_NOT_FOUND]);
        assert_eq!(form.errors().messages("blank"), [MSG_FIELD_NOT_FOUND]);
    }

    proptest! {
        #[test]
        fn valid_iff_no_errors(first in ".{0,6}", last in ".{0,6}", email in ".{0,12}") {
            let mut form = Form::from_pairs([
                ("first_name", first),
                ("last_name", last),
                ("email", email),
            ]);
            form.required(&["first_name", "last_name", "email"]);
            form.min_length("first_name", 3);
            form.is_email("email");

            prop_assert_eq!(form.valid(), form.errors().is_empty());
        }

        #[test]
        fn required_error_count_matches_blank_fields(values in proptest::collection::vec("[a-z ]{0,3}", 1..6)) {
            let names: Vec<String> = (0..values.len()).map(|i| format!("f{i}")).collect();
            let mut form = Form::from_pairs(names.iter().cloned().zip(values.iter().cloned()));
            let fields: Vec<&str> = names.iter().map(String::as_str).collect();
            form.required(&fields);

            let blanks = values.iter().filter(|v| v.trim().is_empty()).count();
            prop_assert_eq!(form.errors().len(), blanks);
        }
    }
}
