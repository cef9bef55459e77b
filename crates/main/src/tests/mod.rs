//! End-to-end tests which drive the whole application through Rocket's
//! local client, against a fresh database for every test.

use chrono::{Days, Utc};
use db::{
    court::Court,
    event::Event,
    group::{Group, Membership},
    schema::{
        courts, events as events_t, groups as groups_t, memberships, users,
    },
    user::User,
};
use diesel::prelude::*;
use rocket::{
    http::{ContentType, Status},
    local::blocking::{Client, LocalResponse},
};
use serde::Serialize;
use tempfile::TempDir;

use crate::{
    auth::{login::LoginForm, register::RegisterForm},
    events::EventForm,
    groups::CreateGroupForm,
    make_rocket,
    util::gen_uuid,
};

mod accounts;
mod events;

pub const PASSWORD: &str = "spike-and-set-42";

pub struct TestApp {
    pub client: Client,
    /// A connection to the same database, for setting up and inspecting
    /// state behind the application's back.
    pub conn: SqliteConnection,
    _dir: TempDir,
}

pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("playone.db").to_str().unwrap().to_string();

    // igniting the client runs the migrations
    let client = Client::tracked(make_rocket(&path)).unwrap();

    let mut conn = SqliteConnection::establish(&path).unwrap();
    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(&mut conn)
        .unwrap();
    diesel::sql_query("PRAGMA busy_timeout = 5000")
        .execute(&mut conn)
        .unwrap();

    TestApp {
        client,
        conn,
        _dir: dir,
    }
}

pub fn post_form<'c, T: Serialize>(
    client: &'c Client,
    uri: impl AsRef<str>,
    form: &T,
) -> LocalResponse<'c> {
    client
        .post(uri.as_ref().to_string())
        .header(ContentType::Form)
        .body(serde_urlencoded::to_string(form).unwrap())
        .dispatch()
}

pub fn post_empty<'c>(client: &'c Client, uri: impl AsRef<str>) -> LocalResponse<'c> {
    client.post(uri.as_ref().to_string()).dispatch()
}

pub fn register(app: &mut TestApp, email: &str, first_name: &str) -> User {
    let response = post_form(
        &app.client,
        "/register",
        &RegisterForm {
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            gender: 1,
            date_of_birth: String::new(),
            password: PASSWORD.to_string(),
            password2: PASSWORD.to_string(),
        },
    );
    assert_eq!(response.status(), Status::SeeOther);

    users::table
        .filter(users::email.eq(email))
        .first::<User>(&mut app.conn)
        .unwrap()
}

/// Logs out whoever is logged in, then logs in as `email`.
pub fn login_as(client: &Client, email: &str) {
    post_empty(client, "/logout");
    let response = post_form(
        client,
        "/login",
        &LoginForm {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        },
    );
    assert_eq!(response.status(), Status::SeeOther);
}

pub fn insert_court(conn: &mut SqliteConnection, name: &str) -> Court {
    diesel::insert_into(courts::table)
        .values((
            courts::public_id.eq(gen_uuid().to_string()),
            courts::name.eq(name),
            courts::created_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .unwrap();
    courts::table
        .filter(courts::name.eq(name))
        .first::<Court>(conn)
        .unwrap()
}

/// Creates a group as the logged in player.
pub fn create_group(app: &mut TestApp, name: &str, court: &Court) -> Group {
    let response = post_form(
        &app.client,
        "/groups/new",
        &CreateGroupForm {
            name: name.to_string(),
            court: court.public_id.clone(),
            about: "Friendly games every week.".to_string(),
        },
    );
    assert_eq!(response.status(), Status::SeeOther);

    groups_t::table
        .filter(groups_t::name.eq(name))
        .first::<Group>(&mut app.conn)
        .unwrap()
}

pub fn event_form(court: &Court, days_ahead: i64, quota: i64, is_public: bool) -> EventForm {
    let today = Utc::now().date_naive();
    let play_date = if days_ahead >= 0 {
        today.checked_add_days(Days::new(days_ahead as u64))
    } else {
        today.checked_sub_days(Days::new(days_ahead.unsigned_abs()))
    }
    .unwrap();

    EventForm {
        court: court.public_id.clone(),
        court_detail: "Court 2".to_string(),
        play_date: play_date.format("%Y-%m-%d").to_string(),
        play_start_time: "19:30".to_string(),
        player_quota: quota,
        play_detail: "Bring a light and a dark shirt.".to_string(),
        is_public,
    }
}

/// Creates an event by posting `form` to `uri`, returning the newest event.
pub fn create_event(app: &mut TestApp, uri: impl AsRef<str>, form: &EventForm) -> Event {
    let response = post_form(&app.client, uri, form);
    assert_eq!(response.status(), Status::SeeOther);

    events_t::table
        .order_by(events_t::id.desc())
        .first::<Event>(&mut app.conn)
        .unwrap()
}

pub fn membership_of(conn: &mut SqliteConnection, group: &Group, user: &User) -> Option<Membership> {
    memberships::table
        .filter(memberships::group_id.eq(group.id))
        .filter(memberships::user_id.eq(user.id))
        .first::<Membership>(conn)
        .optional()
        .unwrap()
}
