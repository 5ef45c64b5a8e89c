//! The booking workflow.
//!
//! [`BookingFlow`] drives a visitor's [`DraftReservation`] from a date
//! search to a committed reservation. Each method takes the visitor's
//! [`SessionData`] by mutable reference; the caller is responsible for
//! loading it before and saving it after, one request at a time per
//! session.
//!
//! # Commit
//!
//! [`BookingFlow::commit`] is the only step with side effects that outlive
//! the session:
//!
//! 1. The reservation row and its room hold are written as one unit
//!    (see [`ReservationRepository::commit_reservation`]).
//! 2. Two notifications are queued: a confirmation to the guest and a
//!    notice to the owner. Queueing never fails the commit.
//!
//! [`ReservationRepository::commit_reservation`]: crate::repository::ReservationRepository::commit_reservation

use crate::availability::{AvailabilityEngine, bounded};
use crate::draft::{DraftReservation, DraftStage};
use crate::error::{BookingError, Result};
use crate::forms::Form;
use crate::notification::{EnqueueOutcome, MailConfig, MailData, SharedNotifier};
use crate::repository::SharedRepository;
use crate::session::{MSG_NO_DRAFT, SessionData};
use crate::types::{GuestDetails, ReservationId, Room, RoomId, RoomRestriction, StayDates};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::time::Duration;

/// Notice shown when the picked room does not exist.
pub const MSG_NO_ROOM: &str = "Can't find room";

/// Default bound on every storage call made by the workflow.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Validate the guest section of the reservation form.
///
/// First name, last name and email are required; the first name must be at
/// least three characters and the email must look like an address.
#[must_use]
pub fn validate_guest(form: &mut Form) -> bool {
    form.required(&["first_name", "last_name", "email"]);
    form.min_length("first_name", 3);
    form.is_email("email");
    form.valid()
}

fn guest_from_form(form: &Form) -> GuestDetails {
    GuestDetails {
        first_name: form.get("first_name").trim().to_string(),
        last_name: form.get("last_name").trim().to_string(),
        email: form.get("email").trim().to_string(),
        phone: form.get("phone").trim().to_string(),
    }
}

fn form_from_guest(guest: &GuestDetails) -> Form {
    Form::from_pairs([
        ("first_name", guest.first_name.as_str()),
        ("last_name", guest.last_name.as_str()),
        ("email", guest.email.as_str()),
        ("phone", guest.phone.as_str()),
    ])
}

/// Orchestrates the reservation draft across requests.
#[derive(Clone)]
pub struct BookingFlow {
    repo: SharedRepository,
    availability: AvailabilityEngine,
    notifier: SharedNotifier,
    mail: MailConfig,
    timeout: Duration,
}

impl BookingFlow {
    /// Create a workflow over `repo`, queueing notifications on `notifier`.
    #[must_use]
    pub fn new(repo: SharedRepository, notifier: SharedNotifier, mail: MailConfig) -> Self {
        Self {
            availability: AvailabilityEngine::new(repo.clone(), DEFAULT_STORAGE_TIMEOUT),
            repo,
            notifier,
            mail,
            timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    /// Bound every storage call by `timeout`.
    #[must_use]
    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.availability = AvailabilityEngine::new(self.repo.clone(), timeout);
        self
    }

    /// The availability engine used by this workflow.
    #[must_use]
    pub const fn availability(&self) -> &AvailabilityEngine {
        &self.availability
    }

    /// Search for rooms free between `start` and `end`.
    ///
    /// When at least one room is free the session's draft is replaced by a
    /// fresh [`DraftStage::DatesSelected`] draft listing them. An empty
    /// result leaves the session untouched.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidDates`] for malformed or empty ranges
    /// - [`BookingError::Query`] / [`BookingError::Timeout`] from storage
    pub async fn search(
        &self,
        session: &mut SessionData,
        start: &str,
        end: &str,
    ) -> Result<Vec<Room>> {
        let stay = StayDates::parse(start, end)?;
        let rooms = self.availability.search_available_rooms(stay).await?;
        if !rooms.is_empty() {
            session.set_draft(DraftReservation::dates_selected(stay, rooms.clone()));
        }
        Ok(rooms)
    }

    /// Pick one of the rooms listed by the last search.
    ///
    /// # Errors
    ///
    /// [`BookingError::MissingContext`] without a search draft, or for a room
    /// that was not listed.
    pub fn choose_room(&self, session: &mut SessionData, room_id: RoomId) -> Result<()> {
        let next = session.draft()?.clone().choose_room(room_id)?;
        tracing::debug!(%room_id, "Room chosen");
        session.set_draft(next);
        Ok(())
    }

    /// Jump straight to a room for the given dates, replacing any draft.
    ///
    /// # Errors
    ///
    /// [`BookingError::InvalidDates`] for malformed or empty ranges.
    pub fn book_room(
        &self,
        session: &mut SessionData,
        room_id: RoomId,
        start: &str,
        end: &str,
    ) -> Result<()> {
        let stay = StayDates::parse(start, end)?;
        session.set_draft(DraftReservation::book_room(stay, room_id));
        Ok(())
    }

    /// The draft to show on the guest-details page, with the room name
    /// resolved.
    ///
    /// # Errors
    ///
    /// - [`BookingError::MissingContext`] without a room-selected draft, or
    ///   if the room does not exist
    /// - [`BookingError::Query`] / [`BookingError::Timeout`] from storage
    pub async fn reservation_form(&self, session: &mut SessionData) -> Result<DraftReservation> {
        let draft = session.draft()?.clone();
        let needs_name = match &draft {
            DraftReservation::RoomSelected { room_name, .. }
            | DraftReservation::DetailsCaptured { room_name, .. } => room_name.is_none(),
            _ => return Err(BookingError::missing_context(MSG_NO_DRAFT)),
        };
        let Some(room_id) = draft.room_id().filter(|_| needs_name) else {
            return Ok(draft);
        };

        let room = self.room(room_id).await?;
        let draft = draft.with_room_name(room.name);
        session.set_draft(draft.clone());
        Ok(draft)
    }

    /// Validate submitted guest details and commit the draft.
    ///
    /// On validation failure nothing is written: the typed values are kept
    /// in the draft and [`BookingError::ValidationFailed`] carries the form
    /// for re-rendering. On a storage failure the draft stays at
    /// [`DraftStage::DetailsCaptured`] so the visitor can retry.
    ///
    /// # Errors
    ///
    /// - [`BookingError::MissingContext`] without a room-selected draft
    /// - [`BookingError::ValidationFailed`] for invalid fields
    /// - [`BookingError::RoomUnavailable`] if the room was taken meanwhile
    /// - [`BookingError::Persistence`] / [`BookingError::Timeout`] from storage
    pub async fn submit_details(
        &self,
        session: &mut SessionData,
        values: HashMap<String, String>,
    ) -> Result<ReservationId> {
        let draft = session.draft()?.clone();
        if !matches!(
            draft.stage(),
            DraftStage::RoomSelected | DraftStage::DetailsCaptured
        ) {
            return Err(BookingError::missing_context(MSG_NO_DRAFT));
        }

        let mut form = Form::new(values);
        let guest = guest_from_form(&form);
        if !validate_guest(&mut form) {
            tracing::debug!(errors = form.errors().len(), "Guest details rejected");
            session.set_draft(draft.retain_typed(guest)?);
            return Err(BookingError::ValidationFailed(Box::new(form)));
        }

        let captured = draft.capture_details(guest)?;
        session.set_draft(captured.clone());

        let committed = self.commit(captured).await?;
        let reservation_id = match &committed {
            DraftReservation::Committed { reservation_id, .. } => *reservation_id,
            _ => return Err(BookingError::missing_context(MSG_NO_DRAFT)),
        };
        session.set_draft(committed);
        Ok(reservation_id)
    }

    /// Persist a captured draft and queue its notifications.
    ///
    /// The draft's guest details are validated again before anything is
    /// written, so a draft assembled outside [`Self::submit_details`] cannot
    /// persist incomplete data.
    ///
    /// # Errors
    ///
    /// - [`BookingError::MissingContext`] unless the draft is at
    ///   [`DraftStage::DetailsCaptured`], or if its room does not exist
    /// - [`BookingError::ValidationFailed`] if the guest details are incomplete
    /// - [`BookingError::RoomUnavailable`] if the room was taken meanwhile
    /// - [`BookingError::Persistence`] / [`BookingError::Timeout`] from storage
    pub async fn commit(&self, draft: DraftReservation) -> Result<DraftReservation> {
        let new = draft.to_new_reservation()?;

        let mut form = form_from_guest(&new.guest);
        if !validate_guest(&mut form) {
            return Err(BookingError::ValidationFailed(Box::new(form)));
        }

        let room = match &draft {
            DraftReservation::DetailsCaptured {
                room_id,
                room_name: Some(name),
                ..
            } => Room::new(*room_id, name.clone()),
            _ => self.room(new.room_id).await?,
        };

        let reservation_id = match bounded(
            "commit_reservation",
            self.timeout,
            self.repo.commit_reservation(&new),
        )
        .await
        {
            Ok(id) => {
                metrics::counter!("bookings.commit.succeeded").increment(1);
                id
            }
            Err(error) => {
                metrics::counter!("bookings.commit.failed").increment(1);
                tracing::error!(room_id = %new.room_id, stay = %new.stay, error = %error, "Reservation commit failed");
                return Err(error);
            }
        };

        tracing::info!(
            %reservation_id,
            room_id = %new.room_id,
            stay = %new.stay,
            "Reservation committed"
        );

        self.notify(self.mail.guest_confirmation(&new.guest, &room, new.stay))
            .await;
        self.notify(self.mail.owner_notice(&new.guest, &room, new.stay))
            .await;

        draft.commit(reservation_id, room)
    }

    /// Read the committed draft for the summary page, removing it from the
    /// session so a reload cannot show or resubmit it.
    ///
    /// # Errors
    ///
    /// [`BookingError::MissingContext`] unless the session holds a committed
    /// draft. A draft at an earlier stage is left in place.
    pub fn take_summary(&self, session: &mut SessionData) -> Result<DraftReservation> {
        let draft = session.take_draft()?;
        if draft.stage() == DraftStage::Committed {
            return Ok(draft);
        }
        session.set_draft(draft);
        Err(BookingError::missing_context(MSG_NO_DRAFT))
    }

    /// The full room catalog.
    ///
    /// # Errors
    ///
    /// [`BookingError::Query`] / [`BookingError::Timeout`] from storage.
    pub async fn rooms(&self) -> Result<Vec<Room>> {
        bounded("all_rooms", self.timeout, self.repo.all_rooms()).await
    }

    /// Round trip to storage, for readiness checks.
    ///
    /// # Errors
    ///
    /// [`BookingError::Query`] / [`BookingError::Timeout`] if storage does
    /// not answer.
    pub async fn ping(&self) -> Result<()> {
        bounded("ping", self.timeout, self.repo.ping()).await
    }

    /// Look up a room, reporting an unknown id as [`BookingError::MissingContext`].
    ///
    /// # Errors
    ///
    /// - [`BookingError::MissingContext`] for an unknown room
    /// - [`BookingError::Query`] / [`BookingError::Timeout`] from storage
    pub async fn room(&self, room_id: RoomId) -> Result<Room> {
        match bounded("get_room_by_id", self.timeout, self.repo.get_room_by_id(room_id)).await {
            Err(BookingError::NotFound(_)) => Err(BookingError::missing_context(MSG_NO_ROOM)),
            other => other,
        }
    }

    /// Block one night of a room for the owner.
    ///
    /// # Errors
    ///
    /// [`BookingError::Persistence`] / [`BookingError::Timeout`] from storage.
    pub async fn block_night(&self, room_id: RoomId, day: NaiveDate) -> Result<()> {
        bounded(
            "insert_owner_block",
            self.timeout,
            self.repo.insert_owner_block(room_id, day),
        )
        .await?;
        tracing::info!(%room_id, %day, "Owner block added");
        Ok(())
    }

    /// Lift an owner block added by [`BookingFlow::block_night`].
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] if that night was not blocked
    /// - [`BookingError::Persistence`] / [`BookingError::Timeout`] from storage
    pub async fn unblock_night(&self, room_id: RoomId, day: NaiveDate) -> Result<()> {
        bounded(
            "delete_owner_block",
            self.timeout,
            self.repo.delete_owner_block(room_id, day),
        )
        .await?;
        tracing::info!(%room_id, %day, "Owner block lifted");
        Ok(())
    }

    /// Restrictions on a room overlapping `stay`.
    ///
    /// # Errors
    ///
    /// [`BookingError::Query`] / [`BookingError::Timeout`] from storage.
    pub async fn restrictions_for_room(
        &self,
        room_id: RoomId,
        stay: StayDates,
    ) -> Result<Vec<RoomRestriction>> {
        bounded(
            "restrictions_for_room",
            self.timeout,
            self.repo.restrictions_for_room(room_id, stay),
        )
        .await
    }

    async fn notify(&self, mail: MailData) {
        let to = mail.to.clone();
        let subject = mail.subject.clone();
        match self.notifier.enqueue(mail).await {
            EnqueueOutcome::Queued => tracing::debug!(%to, %subject, "Notification queued"),
            EnqueueOutcome::Dropped => {
                tracing::warn!(%to, %subject, "Notification dropped");
            }
        }
    }
}
