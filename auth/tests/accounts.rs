//! Registration and sign-in against the deterministic repository.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use bookings_auth::constants::notices;
use bookings_auth::{AccountConfig, AccountService, AuthError, HashingConfig, Passwords};
use bookings_core::{GuestDetails, NewReservation, ReservationRepository, UserId};
use bookings_testing::repository::{FAIL_USER_NAME, GENERALS_QUARTERS};
use bookings_testing::{TestRepository, fixtures};
use std::sync::Arc;

fn config() -> AccountConfig {
    AccountConfig::default().with_hashing(HashingConfig::insecure_fast())
}

fn service(repo: &TestRepository) -> AccountService {
    AccountService::new(Arc::new(repo.clone()), config()).unwrap()
}

fn signup(first_name: &str, email: &str, password: &str) -> std::collections::HashMap<String, String> {
    fixtures::form(&[
        ("first_name", first_name),
        ("last_name", "Smith"),
        ("email", email),
        ("password", password),
    ])
}

#[tokio::test]
async fn register_then_authenticate() {
    let repo = TestRepository::new();
    let accounts = service(&repo);

    let id = accounts
        .register(signup("John", "john@smith.com", "Secret1!"))
        .await
        .unwrap();

    let stored = &repo.accounts()[0];
    assert_eq!(stored.id, id);
    assert_ne!(stored.password_hash, "Secret1!");
    assert_eq!(stored.access_level, 1);

    assert_eq!(
        accounts.authenticate("john@smith.com", "Secret1!").await.unwrap(),
        id
    );
}

#[tokio::test]
async fn unknown_email_and_wrong_password_are_distinct_but_share_a_message() {
    let repo = TestRepository::new();
    let accounts = service(&repo);
    accounts
        .register(signup("John", "john@smith.com", "Secret1!"))
        .await
        .unwrap();

    let unknown = accounts
        .authenticate("nobody@here.com", "Secret1!")
        .await
        .unwrap_err();
    let wrong = accounts
        .authenticate("john@smith.com", "Wrong1!!")
        .await
        .unwrap_err();

    assert_eq!(unknown, AuthError::NotFound);
    assert_eq!(wrong, AuthError::Mismatch);
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn duplicate_email_is_a_field_error() {
    let repo = TestRepository::new();
    let accounts = service(&repo);
    accounts
        .register(signup("John", "john@smith.com", "Secret1!"))
        .await
        .unwrap();

    let err = accounts
        .register(signup("Jane", "john@smith.com", "Secret1!"))
        .await
        .unwrap_err();

    let AuthError::DuplicateEmail(form) = err else {
        panic!("expected duplicate email");
    };
    assert_eq!(form.errors().get("email"), Some(notices::EMAIL_TAKEN));
    assert_eq!(repo.accounts().len(), 1);
}

#[tokio::test]
async fn weak_password_is_rejected_without_writing() {
    let repo = TestRepository::new();
    let accounts = service(&repo);

    let err = accounts
        .register(signup("John", "john@smith.com", "short"))
        .await
        .unwrap_err();

    let AuthError::Validation(form) = err else {
        panic!("expected validation failure");
    };
    assert_eq!(
        form.errors().get("password"),
        Some("This field must be at least 8 characters long")
    );
    assert!(repo.accounts().is_empty());
}

#[tokio::test]
async fn invalid_email_and_short_name_are_reported() {
    let repo = TestRepository::new();
    let err = service(&repo)
        .register(signup("Jo", "notanemail", "Secret1!"))
        .await
        .unwrap_err();

    let AuthError::Validation(form) = err else {
        panic!("expected validation failure");
    };
    assert_eq!(form.errors().get("email"), Some("Invalid email address"));
    assert!(form.errors().get("first_name").is_some());
}

#[tokio::test]
async fn storage_failure_surfaces_as_repository_error() {
    let repo = TestRepository::new();
    let err = service(&repo)
        .register(signup(FAIL_USER_NAME, "error@here.com", "Secret1!"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Repository(_)));
}

#[tokio::test]
async fn seeded_account_with_unreadable_hash_is_a_hashing_error() {
    let repo = TestRepository::new().with_account("Admin", "User", "admin@here.com", "plaintext");
    let err = service(&repo)
        .authenticate("admin@here.com", "Secret1!")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Hashing(_)));
}

#[tokio::test]
async fn booked_rooms_lists_reservations_for_the_account_email() {
    let passwords = Passwords::new(HashingConfig::insecure_fast()).unwrap();
    let hash = passwords.hash("Secret1!").await.unwrap();
    let repo = TestRepository::new().with_account("John", "Smith", "john@smith.com", &hash);
    repo.commit_reservation(&NewReservation {
        guest: GuestDetails {
            email: "john@smith.com".into(),
            ..GuestDetails::default()
        },
        stay: fixtures::stay(),
        room_id: GENERALS_QUARTERS,
    })
    .await
    .unwrap();

    let accounts = service(&repo);
    let id = accounts.authenticate("john@smith.com", "Secret1!").await.unwrap();
    let booked = accounts.booked_rooms(id).await.unwrap();

    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].room.name, "General's Quarters");
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let repo = TestRepository::new();
    let err = service(&repo).account(UserId::new(42)).await.unwrap_err();
    assert_eq!(err, AuthError::NotFound);
}
