//! Events (matches) and the players taking part in them.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::{
    group::role_in_group,
    role::Role,
    schema::{events, participations, users},
    user::User,
};

pub const DEFAULT_PLAYER_QUOTA: i64 = 6;
/// Largest quota a form may ask for.
pub const MAX_PLAYER_QUOTA: i64 = 32767;

#[derive(Debug, Queryable, Serialize, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub public_id: String,
    pub initiator_id: i64,
    pub group_id: Option<i64>,
    pub court_id: i64,
    pub court_detail: String,
    pub play_date: NaiveDate,
    pub play_start_time: NaiveTime,
    pub player_quota: i64,
    pub is_public: bool,
    pub is_expired: bool,
    pub play_detail: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Queryable, Serialize, Clone, PartialEq, Eq)]
pub struct Participation {
    pub id: i64,
    pub public_id: String,
    pub event_id: i64,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
}

/// Who is looking at an event: their id (if logged in) and their role in
/// the event's group (if the event has one and they belong to it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewer {
    pub user_id: Option<i64>,
    pub group_role: Option<Role>,
}

impl Viewer {
    pub const ANONYMOUS: Viewer = Viewer {
        user_id: None,
        group_role: None,
    };

    /// Looks up the viewer's role in the event's group.
    pub fn of(
        conn: &mut SqliteConnection,
        event: &Event,
        user: Option<&User>,
    ) -> QueryResult<Viewer> {
        let user_id = user.map(|user| user.id);
        let group_role = match (event.group_id, user_id) {
            (Some(group_id), Some(user_id)) => {
                role_in_group(conn, group_id, user_id)?
            }
            _ => None,
        };
        Ok(Viewer {
            user_id,
            group_role,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum SignupError {
    #[error("this event has already taken place")]
    Expired,
    #[error("you are not allowed to see this event")]
    NotViewable,
    #[error("this event is already full")]
    Full,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SignupOutcome {
    Join,
    AlreadyParticipating,
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum QuotaError {
    #[error("the player quota must be between 1 and 32767")]
    OutOfRange,
    #[error("{0} players have already signed up, so the quota cannot be lower than that")]
    BelowParticipants(i64),
}

impl Event {
    pub fn load_by_public_id(
        conn: &mut SqliteConnection,
        public_id: &str,
    ) -> QueryResult<Option<Event>> {
        events::table
            .filter(events::public_id.eq(public_id))
            .first::<Event>(conn)
            .optional()
    }

    pub fn is_initiated_by(&self, viewer: &Viewer) -> bool {
        viewer.user_id == Some(self.initiator_id)
    }

    pub fn is_viewable_by(&self, viewer: &Viewer) -> bool {
        self.is_public
            || self.is_initiated_by(viewer)
            || viewer.group_role.is_some_and(Role::is_member)
    }

    pub fn is_editable_by(&self, viewer: &Viewer) -> bool {
        !self.is_expired
            && viewer.user_id.is_some()
            && (self.is_initiated_by(viewer)
                || viewer.group_role.is_some_and(Role::is_admin))
    }

    /// Only the initiator may delete an event, and not once it is in the
    /// past.
    pub fn is_deletable_by(&self, viewer: &Viewer, today: NaiveDate) -> bool {
        self.is_initiated_by(viewer) && self.play_date >= today
    }

    /// Decides what signing `viewer` up should do, given how many players
    /// are taking part and whether `viewer` is already one of them.
    pub fn check_signup(
        &self,
        viewer: &Viewer,
        participants: i64,
        already_participating: bool,
    ) -> Result<SignupOutcome, SignupError> {
        if self.is_expired {
            return Err(SignupError::Expired);
        }
        if !self.is_viewable_by(viewer) {
            return Err(SignupError::NotViewable);
        }
        if already_participating {
            return Ok(SignupOutcome::AlreadyParticipating);
        }
        if participants >= self.player_quota {
            return Err(SignupError::Full);
        }
        Ok(SignupOutcome::Join)
    }

    pub fn check_quota(
        new_quota: i64,
        participants: i64,
    ) -> Result<(), QuotaError> {
        if !(1..=MAX_PLAYER_QUOTA).contains(&new_quota) {
            return Err(QuotaError::OutOfRange);
        }
        if new_quota < participants {
            return Err(QuotaError::BelowParticipants(participants));
        }
        Ok(())
    }

    pub fn participant_count(
        &self,
        conn: &mut SqliteConnection,
    ) -> QueryResult<i64> {
        participations::table
            .filter(participations::event_id.eq(self.id))
            .count()
            .get_result::<i64>(conn)
    }

    pub fn has_participant(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
    ) -> QueryResult<bool> {
        diesel::select(diesel::dsl::exists(
            participations::table
                .filter(participations::event_id.eq(self.id))
                .filter(participations::user_id.eq(user_id)),
        ))
        .get_result::<bool>(conn)
    }

    /// Participants in signup order.
    pub fn participants(
        &self,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Vec<User>> {
        participations::table
            .filter(participations::event_id.eq(self.id))
            .inner_join(users::table)
            .order_by(participations::id.asc())
            .select(users::all_columns)
            .load::<User>(conn)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, Utc};

    use super::{Event, QuotaError, SignupError, SignupOutcome, Viewer};
    use crate::role::Role;

    const INITIATOR: i64 = 1;
    const OTHER: i64 = 2;

    fn event(is_public: bool, group_id: Option<i64>) -> Event {
        Event {
            id: 10,
            public_id: "e".to_string(),
            initiator_id: INITIATOR,
            group_id,
            court_id: 1,
            court_detail: String::new(),
            play_date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            play_start_time: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            player_quota: 2,
            is_public,
            is_expired: false,
            play_detail: String::new(),
            created_at: Utc::now().naive_utc(),
        }
    }

    fn viewer(user_id: i64, group_role: Option<Role>) -> Viewer {
        Viewer {
            user_id: Some(user_id),
            group_role,
        }
    }

    #[test]
    fn public_events_are_visible_to_everyone() {
        assert!(event(true, None).is_viewable_by(&Viewer::ANONYMOUS));
    }

    #[test]
    fn private_events_need_membership_or_authorship() {
        let e = event(false, Some(3));
        assert!(!e.is_viewable_by(&Viewer::ANONYMOUS));
        assert!(!e.is_viewable_by(&viewer(OTHER, None)));
        assert!(!e.is_viewable_by(&viewer(OTHER, Some(Role::Pending))));
        assert!(e.is_viewable_by(&viewer(OTHER, Some(Role::Member))));
        assert!(e.is_viewable_by(&viewer(OTHER, Some(Role::Admin))));
        assert!(e.is_viewable_by(&viewer(OTHER, Some(Role::Organizer))));
        assert!(e.is_viewable_by(&viewer(INITIATOR, None)));
    }

    #[test]
    fn editing() {
        let mut e = event(true, Some(3));
        assert!(e.is_editable_by(&viewer(INITIATOR, None)));
        assert!(e.is_editable_by(&viewer(OTHER, Some(Role::Admin))));
        assert!(!e.is_editable_by(&viewer(OTHER, Some(Role::Member))));
        assert!(!e.is_editable_by(&Viewer::ANONYMOUS));

        e.is_expired = true;
        assert!(!e.is_editable_by(&viewer(INITIATOR, None)));
    }

    #[test]
    fn deleting_past_events_is_refused() {
        let e = event(true, None);
        let before = NaiveDate::from_ymd_opt(2030, 4, 30).unwrap();
        let after = NaiveDate::from_ymd_opt(2030, 5, 2).unwrap();
        assert!(e.is_deletable_by(&viewer(INITIATOR, None), before));
        assert!(e.is_deletable_by(&viewer(INITIATOR, None), e.play_date));
        assert!(!e.is_deletable_by(&viewer(INITIATOR, None), after));
        assert!(!e.is_deletable_by(&viewer(OTHER, Some(Role::Organizer)), before));
    }

    #[test]
    fn signup_respects_quota() {
        let e = event(true, None);
        let v = viewer(OTHER, None);
        assert_eq!(e.check_signup(&v, 0, false), Ok(SignupOutcome::Join));
        assert_eq!(e.check_signup(&v, 1, false), Ok(SignupOutcome::Join));
        assert_eq!(e.check_signup(&v, 2, false), Err(SignupError::Full));
        assert_eq!(
            e.check_signup(&v, 2, true),
            Ok(SignupOutcome::AlreadyParticipating)
        );
    }

    #[test]
    fn signup_refused_for_expired_or_hidden_events() {
        let mut e = event(false, Some(3));
        assert_eq!(
            e.check_signup(&viewer(OTHER, None), 0, false),
            Err(SignupError::NotViewable)
        );
        e.is_expired = true;
        assert_eq!(
            e.check_signup(&viewer(INITIATOR, None), 0, false),
            Err(SignupError::Expired)
        );
    }

    #[test]
    fn quota_cannot_drop_below_participants() {
        assert_eq!(Event::check_quota(4, 3), Ok(()));
        assert_eq!(Event::check_quota(3, 3), Ok(()));
        assert_eq!(
            Event::check_quota(2, 3),
            Err(QuotaError::BelowParticipants(3))
        );
        assert_eq!(Event::check_quota(0, 0), Err(QuotaError::OutOfRange));
    }
}
