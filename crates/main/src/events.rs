//! Events (matches), signups and withdrawals.

use chrono::{NaiveDate, NaiveTime, Utc};
use db::{
    court::Court,
    event::{Event, QuotaError, SignupError, SignupOutcome, Viewer},
    group::Group,
    schema::{courts, events, participations, users},
    user::User,
    DbConn,
};
use diesel::{
    insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use maud::{html, Markup};
use rocket::{form::Form, response::Redirect};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{action_button, error_403, error_404, form_error, page_of_body, page_title};

use crate::{
    courts::court_select,
    permissions::{has_permission, GroupRef, Permission},
    util::gen_uuid,
    util_resp::{
        bad_request, err_not_found, forbidden, see_other_ok, success,
        StandardResponse,
    },
};

/// Longest court or play detail accepted.
const MAX_DETAIL_CHARS: usize = 300;

/// Events with their courts, soonest first.
pub fn event_table(rows: &[(Event, Court)]) -> Markup {
    html! {
        @if rows.is_empty() {
            p class="text-muted" { "No upcoming events." }
        } @else {
            table class="table" {
                thead {
                    tr {
                        th scope="col" { "Date" }
                        th scope="col" { "Start" }
                        th scope="col" { "Court" }
                        th scope="col" { "Quota" }
                        th scope="col" {}
                    }
                }
                tbody {
                    @for (event, court) in rows {
                        tr {
                            td { (event.play_date.format("%Y-%m-%d")) }
                            td { (event.play_start_time.format("%H:%M")) }
                            td { (court.name) }
                            td { (event.player_quota) }
                            td { a href=(format!("/events/{}", event.public_id)) { "View" } }
                        }
                    }
                }
            }
        }
    }
}

#[get("/events")]
pub async fn list_events(
    user: Option<User>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    let rows = db
        .run(|conn| {
            events::table
                .inner_join(courts::table)
                .filter(events::is_public.eq(true))
                .filter(events::is_expired.eq(false))
                .order_by((events::play_date.asc(), events::play_start_time.asc()))
                .load::<(Event, Court)>(conn)
        })
        .instrument(span.0)
        .await?;

    success(page_of_body(
        html! {
            (page_title("Events"))
            @if user.is_some() {
                a class="btn btn-primary mb-3" href="/events/new" { "Create an event" }
            }
            (event_table(&rows))
        },
        user,
    ))
}

#[derive(FromForm, Serialize, Debug, Default)]
pub struct EventForm {
    /// Public id of the court.
    pub court: String,
    pub court_detail: String,
    /// `YYYY-MM-DD`
    pub play_date: String,
    /// `HH:MM`
    pub play_start_time: String,
    pub player_quota: i64,
    pub play_detail: String,
    /// Only read for group events; standalone events are always public.
    pub is_public: bool,
}

struct NewEvent {
    court_id: i64,
    play_date: NaiveDate,
    play_start_time: NaiveTime,
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn validate_details(court_detail: &str, play_detail: &str) -> Result<(), &'static str> {
    if court_detail.chars().count() > MAX_DETAIL_CHARS
        || play_detail.chars().count() > MAX_DETAIL_CHARS
    {
        return Err("Error: details may be at most 300 characters long.");
    }
    Ok(())
}

impl EventForm {
    fn validate(&self, courts: &[Court]) -> Result<NewEvent, String> {
        let court = courts
            .iter()
            .find(|court| court.public_id == self.court)
            .ok_or("Error: please choose a court.")?;
        let play_date =
            NaiveDate::parse_from_str(self.play_date.trim(), "%Y-%m-%d")
                .map_err(|_| "Error: that play date is not valid.")?;
        let play_start_time = parse_time(&self.play_start_time)
            .ok_or("Error: that start time is not valid.")?;
        Event::check_quota(self.player_quota, 0)
            .map_err(|e| format!("Error: {e}."))?;
        validate_details(&self.court_detail, &self.play_detail)?;

        Ok(NewEvent {
            court_id: court.id,
            play_date,
            play_start_time,
        })
    }
}

fn event_form(
    action: &str,
    courts: &[Court],
    form: &EventForm,
    with_visibility: bool,
    error: Option<&str>,
) -> Markup {
    html! {
        (form_error(error))
        form method="post" action=(action) {
            div class="mb-3" {
                label for="court" class="form-label" { "Court" }
                (court_select(courts, Some(form.court.as_str())))
            }
            div class="mb-3" {
                label for="court_detail" class="form-label" { "Court detail" }
                input type="text" class="form-control" id="court_detail" name="court_detail" value=(form.court_detail);
            }
            div class="mb-3" {
                label for="play_date" class="form-label" { "Date" }
                input type="date" class="form-control" id="play_date" name="play_date" value=(form.play_date) required;
            }
            div class="mb-3" {
                label for="play_start_time" class="form-label" { "Start time" }
                input type="time" class="form-control" id="play_start_time" name="play_start_time" value=(form.play_start_time) required;
            }
            div class="mb-3" {
                label for="player_quota" class="form-label" { "Player quota" }
                input type="number" min="1" class="form-control" id="player_quota" name="player_quota" value=(form.player_quota) required;
            }
            @if with_visibility {
                div class="form-check mb-3" {
                    input class="form-check-input" type="checkbox" id="is_public" name="is_public" value="true" checked[form.is_public];
                    label class="form-check-label" for="is_public" { "Visible to everyone" }
                }
            }
            div class="mb-3" {
                label for="play_detail" class="form-label" { "Play detail" }
                textarea class="form-control" id="play_detail" name="play_detail" rows="3" { (form.play_detail) }
            }
            button type="submit" class="btn btn-primary" { "Save" }
        }
    }
}

fn blank_event_form(court: Option<&Court>, is_public: bool) -> EventForm {
    let now = Utc::now().naive_utc();
    EventForm {
        court: court.map(|court| court.public_id.clone()).unwrap_or_default(),
        play_date: now.format("%Y-%m-%d").to_string(),
        play_start_time: now.format("%H:%M").to_string(),
        player_quota: db::event::DEFAULT_PLAYER_QUOTA,
        is_public,
        ..EventForm::default()
    }
}

fn insert_event(
    conn: &mut SqliteConnection,
    initiator: &User,
    group: Option<&Group>,
    form: &EventForm,
    new: NewEvent,
    is_public: bool,
) -> QueryResult<String> {
    let public_id = gen_uuid().to_string();
    insert_into(events::table)
        .values((
            events::public_id.eq(&public_id),
            events::initiator_id.eq(initiator.id),
            events::group_id.eq(group.map(|group| group.id)),
            events::court_id.eq(new.court_id),
            events::court_detail.eq(form.court_detail.trim()),
            events::play_date.eq(new.play_date),
            events::play_start_time.eq(new.play_start_time),
            events::player_quota.eq(form.player_quota),
            events::is_public.eq(is_public),
            events::is_expired.eq(false),
            events::play_detail.eq(form.play_detail.trim()),
            events::created_at.eq(diesel::dsl::now),
        ))
        .execute(conn)?;
    tracing::info!("Created event {public_id}");
    Ok(public_id)
}

#[get("/events/new")]
pub async fn create_event_page(
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    let courts = db.run(|conn| Court::load_all(conn)).instrument(span.0).await?;
    let form = blank_event_form(courts.first(), true);
    success(page_of_body(
        html! {
            (page_title("Create an event"))
            (event_form("/events/new", &courts, &form, false, None))
        },
        Some(user),
    ))
}

/// Standalone events are always public.
#[post("/events/new", data = "<form>")]
pub async fn do_create_event(
    user: User,
    form: Form<EventForm>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    let form = form.into_inner();
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            let courts = Court::load_all(conn)?;
            let new = match form.validate(&courts) {
                Ok(new) => new,
                Err(msg) => {
                    return bad_request(page_of_body(
                        html! {
                            (page_title("Create an event"))
                            (event_form("/events/new", &courts, &form, false, Some(&msg)))
                        },
                        Some(user),
                    ))
                }
            };

            let public_id = insert_event(conn, &user, None, &form, new, true)?;
            see_other_ok(Redirect::to(format!("/events/{public_id}")))
        })
    })
    .instrument(span.0)
    .await
}

fn not_allowed_in_group(user: User) -> StandardResponse {
    forbidden(error_403(
        Some("Only members of this group may schedule its events."),
        Some(user),
    ))
}

#[get("/groups/<group_id>/events/new")]
pub async fn create_group_event_page(
    group_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| -> StandardResponse {
        let Some(group) = Group::load_by_public_id(conn, &group_id)? else {
            return err_not_found(error_404(Some("No such group."), Some(user)));
        };
        if !has_permission(
            Some(&user),
            &Permission::CreateEventInGroup(GroupRef(group.id)),
            conn,
        )? {
            return not_allowed_in_group(user);
        }

        let courts = Court::load_all(conn)?;
        let home_court = courts.iter().find(|court| court.id == group.court_id);
        let form = blank_event_form(home_court, false);
        let action = format!("/groups/{}/events/new", group.public_id);
        success(page_of_body(
            html! {
                (page_title(format!("New event for {}", group.name)))
                (event_form(&action, &courts, &form, true, None))
            },
            Some(user),
        ))
    })
    .instrument(span.0)
    .await
}

#[post("/groups/<group_id>/events/new", data = "<form>")]
pub async fn do_create_group_event(
    group_id: String,
    user: User,
    form: Form<EventForm>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    let form = form.into_inner();
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            let Some(group) = Group::load_by_public_id(conn, &group_id)? else {
                return err_not_found(error_404(
                    Some("No such group."),
                    Some(user),
                ));
            };
            if !has_permission(
                Some(&user),
                &Permission::CreateEventInGroup(GroupRef(group.id)),
                conn,
            )? {
                return not_allowed_in_group(user);
            }

            let courts = Court::load_all(conn)?;
            let new = match form.validate(&courts) {
                Ok(new) => new,
                Err(msg) => {
                    let action = format!("/groups/{}/events/new", group.public_id);
                    return bad_request(page_of_body(
                        html! {
                            (page_title(format!("New event for {}", group.name)))
                            (event_form(&action, &courts, &form, true, Some(&msg)))
                        },
                        Some(user),
                    ));
                }
            };

            let public_id =
                insert_event(conn, &user, Some(&group), &form, new, form.is_public)?;
            see_other_ok(Redirect::to(format!("/events/{public_id}")))
        })
    })
    .instrument(span.0)
    .await
}

fn not_found(user: Option<User>) -> StandardResponse {
    err_not_found(error_404(Some("No such event."), user))
}

#[get("/events/<event_id>")]
pub async fn view_event(
    event_id: String,
    user: Option<User>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| -> StandardResponse {
        let Some(event) = Event::load_by_public_id(conn, &event_id)? else {
            return not_found(user);
        };
        let viewer = Viewer::of(conn, &event, user.as_ref())?;
        if !event.is_viewable_by(&viewer) {
            return forbidden(error_403(Some(SignupError::NotViewable), user));
        }

        let court = courts::table
            .filter(courts::id.eq(event.court_id))
            .first::<Court>(conn)?;
        let initiator = users::table
            .filter(users::id.eq(event.initiator_id))
            .first::<User>(conn)?;
        let group = match event.group_id {
            Some(group_id) => Some(
                db::schema::groups::table
                    .filter(db::schema::groups::id.eq(group_id))
                    .first::<Group>(conn)?,
            ),
            None => None,
        };
        let participants = event.participants(conn)?;
        let participating = viewer
            .user_id
            .is_some_and(|id| participants.iter().any(|p| p.id == id));
        let has_room = (participants.len() as i64) < event.player_quota;
        let today = Utc::now().date_naive();
        let base = format!("/events/{}", event.public_id);

        let markup = html! {
            (page_title(format!(
                "{} {} at {}",
                event.play_date.format("%Y-%m-%d"),
                event.play_start_time.format("%H:%M"),
                court.name
            )))
            dl class="row" {
                dt class="col-sm-3" { "Court" }
                dd class="col-sm-9" {
                    a href=(format!("/courts/{}", court.public_id)) { (court.name) }
                    @if !event.court_detail.is_empty() { " (" (event.court_detail) ")" }
                }
                @if let Some(group) = &group {
                    dt class="col-sm-3" { "Group" }
                    dd class="col-sm-9" {
                        a href=(format!("/groups/{}", group.public_id)) { (group.name) }
                    }
                }
                dt class="col-sm-3" { "Initiator" }
                dd class="col-sm-9" { (initiator.full_name()) }
                dt class="col-sm-3" { "Players" }
                dd class="col-sm-9" { (participants.len()) " / " (event.player_quota) }
                dt class="col-sm-3" { "Visibility" }
                dd class="col-sm-9" { @if event.is_public { "Public" } @else { "Group members only" } }
                @if !event.play_detail.is_empty() {
                    dt class="col-sm-3" { "Details" }
                    dd class="col-sm-9" style="white-space: pre-wrap" { (event.play_detail) }
                }
            }
            @if event.is_expired {
                div class="alert alert-secondary" { "This event has already taken place." }
            } @else if viewer.user_id.is_some() {
                div class="mb-3" {
                    @if participating {
                        (action_button(&format!("{base}/quit"), "Withdraw", "btn-outline-danger"))
                    } @else if has_room {
                        (action_button(&format!("{base}/signup"), "Sign up", "btn-success"))
                    } @else {
                        span class="badge text-bg-secondary" { "Full" }
                    }
                    @if event.is_editable_by(&viewer) {
                        a class="btn btn-sm btn-secondary m-1" href=(format!("{base}/edit")) { "Edit" }
                    }
                    @if event.is_deletable_by(&viewer, today) {
                        (action_button(&format!("{base}/delete"), "Delete", "btn-danger"))
                    }
                }
            }
            h3 { "Players" }
            ol class="list-group list-group-numbered" {
                @for player in &participants {
                    li class="list-group-item" { (player.full_name()) }
                }
            }
        };

        success(page_of_body(markup, user))
    })
    .instrument(span.0)
    .await
}

#[derive(FromForm, Serialize, Debug)]
pub struct EditEventForm {
    pub court_detail: String,
    pub player_quota: i64,
    pub play_detail: String,
}

fn edit_event_page(
    event: &Event,
    form: &EditEventForm,
    error: Option<&str>,
    user: User,
) -> Markup {
    page_of_body(
        html! {
            (page_title("Edit event"))
            (form_error(error))
            form method="post" action=(format!("/events/{}/edit", event.public_id)) {
                div class="mb-3" {
                    label for="court_detail" class="form-label" { "Court detail" }
                    input type="text" class="form-control" id="court_detail" name="court_detail" value=(form.court_detail);
                }
                div class="mb-3" {
                    label for="player_quota" class="form-label" { "Player quota" }
                    input type="number" min="1" class="form-control" id="player_quota" name="player_quota" value=(form.player_quota) required;
                }
                div class="mb-3" {
                    label for="play_detail" class="form-label" { "Play detail" }
                    textarea class="form-control" id="play_detail" name="play_detail" rows="3" { (form.play_detail) }
                }
                button type="submit" class="btn btn-primary" { "Save" }
            }
        },
        Some(user),
    )
}

fn not_editable(user: User) -> StandardResponse {
    forbidden(error_403(
        Some("Only the initiator or a group admin may edit this event, and only before it has expired."),
        Some(user),
    ))
}

#[get("/events/<event_id>/edit")]
pub async fn edit_event_form(
    event_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| -> StandardResponse {
        let Some(event) = Event::load_by_public_id(conn, &event_id)? else {
            return not_found(Some(user));
        };
        let viewer = Viewer::of(conn, &event, Some(&user))?;
        if !event.is_editable_by(&viewer) {
            return not_editable(user);
        }

        let form = EditEventForm {
            court_detail: event.court_detail.clone(),
            player_quota: event.player_quota,
            play_detail: event.play_detail.clone(),
        };
        success(edit_event_page(&event, &form, None, user))
    })
    .instrument(span.0)
    .await
}

/// Updates the details and quota. The quota may not drop below the number
/// of players already signed up.
#[post("/events/<event_id>/edit", data = "<form>")]
pub async fn do_edit_event(
    event_id: String,
    user: User,
    form: Form<EditEventForm>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    let form = form.into_inner();
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            let Some(event) = Event::load_by_public_id(conn, &event_id)? else {
                return not_found(Some(user));
            };
            let viewer = Viewer::of(conn, &event, Some(&user))?;
            if !event.is_editable_by(&viewer) {
                return not_editable(user);
            }

            let participants = event.participant_count(conn)?;
            if let Err(e) = Event::check_quota(form.player_quota, participants) {
                if let QuotaError::BelowParticipants(_) = e {
                    tracing::info!(
                        "Refused to lower the quota of event {} below {participants}",
                        event.public_id
                    );
                }
                let msg = format!("Error: {e}.");
                return bad_request(edit_event_page(&event, &form, Some(&msg), user));
            }
            if let Err(msg) = validate_details(&form.court_detail, &form.play_detail) {
                return bad_request(edit_event_page(&event, &form, Some(msg), user));
            }

            diesel::update(events::table.filter(events::id.eq(event.id)))
                .set((
                    events::court_detail.eq(form.court_detail.trim()),
                    events::player_quota.eq(form.player_quota),
                    events::play_detail.eq(form.play_detail.trim()),
                ))
                .execute(conn)?;

            see_other_ok(Redirect::to(format!("/events/{}", event.public_id)))
        })
    })
    .instrument(span.0)
    .await
}

/// Only the initiator may delete an event, and only until its play date has
/// passed.
#[post("/events/<event_id>/delete")]
pub async fn do_delete_event(
    event_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            let Some(event) = Event::load_by_public_id(conn, &event_id)? else {
                return not_found(Some(user));
            };
            let viewer = Viewer::of(conn, &event, Some(&user))?;
            if !event.is_deletable_by(&viewer, Utc::now().date_naive()) {
                return forbidden(error_403(
                    Some("Only the initiator may delete this event, and not once it has taken place."),
                    Some(user),
                ));
            }

            diesel::delete(events::table.filter(events::id.eq(event.id)))
                .execute(conn)?;
            tracing::info!("Deleted event {}", event.public_id);

            see_other_ok(Redirect::to("/events"))
        })
    })
    .instrument(span.0)
    .await
}

#[post("/events/<event_id>/signup")]
pub async fn do_signup(
    event_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            let Some(event) = Event::load_by_public_id(conn, &event_id)? else {
                return not_found(Some(user));
            };
            let viewer = Viewer::of(conn, &event, Some(&user))?;
            let participants = event.participant_count(conn)?;
            let already = event.has_participant(conn, user.id)?;

            match event.check_signup(&viewer, participants, already) {
                Ok(SignupOutcome::AlreadyParticipating) => (),
                Ok(SignupOutcome::Join) => {
                    let inserted = insert_into(participations::table)
                        .values((
                            participations::public_id.eq(gen_uuid().to_string()),
                            participations::event_id.eq(event.id),
                            participations::user_id.eq(user.id),
                            participations::created_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn);
                    match inserted {
                        Ok(_) => tracing::info!("Player signed up for event {}", event.public_id),
                        // lost a race with a concurrent request by the same player
                        Err(DieselError::DatabaseError(
                            DatabaseErrorKind::UniqueViolation,
                            _,
                        )) => (),
                        // the quota trigger fired
                        Err(DieselError::DatabaseError(_, info))
                            if info.message().contains("event is full") =>
                        {
                            return forbidden(error_403(Some(SignupError::Full), Some(user)));
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => {
                    tracing::info!("Refused signup for event {} ({e})", event.public_id);
                    return forbidden(error_403(Some(e), Some(user)));
                }
            }

            see_other_ok(Redirect::to(format!("/events/{}", event.public_id)))
        })
    })
    .instrument(span.0)
    .await
}

/// Withdraws from an event. Does nothing if the player had not signed up.
#[post("/events/<event_id>/quit")]
pub async fn do_quit_event(
    event_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            let Some(event) = Event::load_by_public_id(conn, &event_id)? else {
                return not_found(Some(user));
            };
            if event.is_expired {
                return forbidden(error_403(Some(SignupError::Expired), Some(user)));
            }

            let n = diesel::delete(
                participations::table
                    .filter(participations::event_id.eq(event.id))
                    .filter(participations::user_id.eq(user.id)),
            )
            .execute(conn)?;
            if n > 0 {
                tracing::info!("Player withdrew from event {}", event.public_id);
            }

            see_other_ok(Redirect::to(format!("/events/{}", event.public_id)))
        })
    })
    .instrument(span.0)
    .await
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::{parse_time, validate_details};

    #[test]
    fn start_times_with_or_without_seconds() {
        assert_eq!(parse_time("19:30"), NaiveTime::from_hms_opt(19, 30, 0));
        assert_eq!(parse_time("07:05:00"), NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(parse_time("7pm"), None);
    }

    #[test]
    fn details_are_limited() {
        assert!(validate_details("Court 3", "").is_ok());
        assert!(validate_details(&"x".repeat(301), "").is_err());
        assert!(validate_details("", &"é".repeat(300)).is_ok());
    }
}
