use chrono::Utc;
use db::{
    event::Event,
    schema::{events, participations, users},
};
use diesel::prelude::*;
use rocket::http::Status;

use super::{
    create_event, create_group, event_form, insert_court, login_as, membership_of,
    post_empty, post_form, register, test_app,
};
use crate::{admin::expire::expire_events_before, events::EditEventForm, util::gen_uuid};

fn participants(conn: &mut SqliteConnection, event: &Event) -> i64 {
    participations::table
        .filter(participations::event_id.eq(event.id))
        .count()
        .get_result::<i64>(conn)
        .unwrap()
}

#[test]
fn signups_stop_at_the_quota() {
    let mut app = test_app();
    register(&mut app, "olga@example.com", "Olga");
    register(&mut app, "pat@example.com", "Pat");
    register(&mut app, "quinn@example.com", "Quinn");
    let court = insert_court(&mut app.conn, "Riverside Gym");

    login_as(&app.client, "olga@example.com");
    let event = create_event(&mut app, "/events/new", &event_form(&court, 3, 1, true));
    assert!(event.is_public);
    let signup = format!("/events/{}/signup", event.public_id);

    login_as(&app.client, "pat@example.com");
    assert_eq!(post_empty(&app.client, &signup).status(), Status::SeeOther);
    // signing up twice changes nothing
    assert_eq!(post_empty(&app.client, &signup).status(), Status::SeeOther);
    assert_eq!(participants(&mut app.conn, &event), 1);

    login_as(&app.client, "quinn@example.com");
    assert_eq!(post_empty(&app.client, &signup).status(), Status::Forbidden);
    assert_eq!(participants(&mut app.conn, &event), 1);

    // withdrawing frees the place
    login_as(&app.client, "pat@example.com");
    let quit = format!("/events/{}/quit", event.public_id);
    assert_eq!(post_empty(&app.client, &quit).status(), Status::SeeOther);
    login_as(&app.client, "quinn@example.com");
    assert_eq!(post_empty(&app.client, &signup).status(), Status::SeeOther);
    assert_eq!(participants(&mut app.conn, &event), 1);
}

#[test]
fn private_group_events_are_hidden_from_outsiders() {
    let mut app = test_app();
    register(&mut app, "olga@example.com", "Olga");
    register(&mut app, "sam@example.com", "Sam");
    let court = insert_court(&mut app.conn, "Riverside Gym");

    login_as(&app.client, "olga@example.com");
    let group = create_group(&mut app, "Tuesday Sixes", &court);
    let event = create_event(
        &mut app,
        format!("/groups/{}/events/new", group.public_id),
        &event_form(&court, 2, 12, false),
    );
    assert_eq!(event.group_id, Some(group.id));
    assert!(!event.is_public);
    let uri = format!("/events/{}", event.public_id);

    assert_eq!(app.client.get(uri.as_str()).dispatch().status(), Status::Ok);

    login_as(&app.client, "sam@example.com");
    assert_eq!(app.client.get(uri.as_str()).dispatch().status(), Status::Forbidden);
    assert_eq!(
        post_empty(&app.client, format!("{uri}/signup")).status(),
        Status::Forbidden
    );
    assert_eq!(participants(&mut app.conn, &event), 0);

    // outsiders cannot schedule events for the group either
    assert_eq!(
        post_form(
            &app.client,
            format!("/groups/{}/events/new", group.public_id),
            &event_form(&court, 2, 12, true),
        )
        .status(),
        Status::Forbidden
    );

    post_empty(&app.client, "/logout");
    assert_eq!(app.client.get(uri.as_str()).dispatch().status(), Status::Forbidden);
}

#[test]
fn quota_cannot_drop_below_participants() {
    let mut app = test_app();
    register(&mut app, "olga@example.com", "Olga");
    register(&mut app, "pat@example.com", "Pat");
    register(&mut app, "quinn@example.com", "Quinn");
    let court = insert_court(&mut app.conn, "Riverside Gym");

    login_as(&app.client, "olga@example.com");
    let event = create_event(&mut app, "/events/new", &event_form(&court, 5, 3, true));
    let signup = format!("/events/{}/signup", event.public_id);
    for email in ["pat@example.com", "quinn@example.com"] {
        login_as(&app.client, email);
        assert_eq!(post_empty(&app.client, &signup).status(), Status::SeeOther);
    }

    let edit = |quota| EditEventForm {
        court_detail: "Court 1".to_string(),
        player_quota: quota,
        play_detail: String::new(),
    };
    let uri = format!("/events/{}/edit", event.public_id);

    // only the initiator (or a group admin) may edit
    assert_eq!(
        post_form(&app.client, &uri, &edit(2)).status(),
        Status::Forbidden
    );

    login_as(&app.client, "olga@example.com");
    assert_eq!(
        post_form(&app.client, &uri, &edit(1)).status(),
        Status::BadRequest
    );
    let quota = events::table
        .filter(events::id.eq(event.id))
        .select(events::player_quota)
        .first::<i64>(&mut app.conn)
        .unwrap();
    assert_eq!(quota, 3);

    assert_eq!(
        post_form(&app.client, &uri, &edit(2)).status(),
        Status::SeeOther
    );
    let quota = events::table
        .filter(events::id.eq(event.id))
        .select(events::player_quota)
        .first::<i64>(&mut app.conn)
        .unwrap();
    assert_eq!(quota, 2);
}

#[test]
fn group_admins_edit_but_members_do_not() {
    let mut app = test_app();
    register(&mut app, "olga@example.com", "Olga");
    let admin = register(&mut app, "ada@example.com", "Ada");
    let member = register(&mut app, "pat@example.com", "Pat");
    let court = insert_court(&mut app.conn, "Riverside Gym");

    login_as(&app.client, "olga@example.com");
    let group = create_group(&mut app, "Tuesday Sixes", &court);
    for email in ["ada@example.com", "pat@example.com"] {
        login_as(&app.client, email);
        post_empty(&app.client, format!("/groups/{}/join", group.public_id));
    }
    login_as(&app.client, "olga@example.com");
    for (user, role) in [(&admin, "admin"), (&member, "member")] {
        let request = membership_of(&mut app.conn, &group, user).unwrap();
        let response = post_empty(
            &app.client,
            format!("/memberships/{}/{role}", request.public_id),
        );
        assert_eq!(response.status(), Status::SeeOther);
    }

    let event = create_event(
        &mut app,
        format!("/groups/{}/events/new", group.public_id),
        &event_form(&court, 4, 12, false),
    );
    let uri = format!("/events/{}/edit", event.public_id);
    let edit = |detail: &str| EditEventForm {
        court_detail: detail.to_string(),
        player_quota: 10,
        play_detail: String::new(),
    };
    let court_detail = |conn: &mut SqliteConnection| {
        events::table
            .filter(events::id.eq(event.id))
            .select(events::court_detail)
            .first::<String>(conn)
            .unwrap()
    };

    login_as(&app.client, "ada@example.com");
    assert_eq!(
        post_form(&app.client, &uri, &edit("Court 3")).status(),
        Status::SeeOther
    );
    assert_eq!(court_detail(&mut app.conn), "Court 3");

    login_as(&app.client, "pat@example.com");
    assert_eq!(
        post_form(&app.client, &uri, &edit("Court 4")).status(),
        Status::Forbidden
    );
    assert_eq!(court_detail(&mut app.conn), "Court 3");

    // expired events are frozen, even for their initiator
    diesel::update(events::table.filter(events::id.eq(event.id)))
        .set(events::is_expired.eq(true))
        .execute(&mut app.conn)
        .unwrap();
    login_as(&app.client, "olga@example.com");
    assert_eq!(
        post_form(&app.client, &uri, &edit("Court 5")).status(),
        Status::Forbidden
    );
    assert_eq!(court_detail(&mut app.conn), "Court 3");
}

#[test]
fn database_rejects_over_quota_participation() {
    let mut app = test_app();
    let organizer = register(&mut app, "olga@example.com", "Olga");
    let player = register(&mut app, "pat@example.com", "Pat");
    let court = insert_court(&mut app.conn, "Riverside Gym");

    login_as(&app.client, "olga@example.com");
    let event = create_event(&mut app, "/events/new", &event_form(&court, 1, 1, true));

    let mut join = |user_id: i64| {
        diesel::insert_into(participations::table)
            .values((
                participations::public_id.eq(gen_uuid().to_string()),
                participations::event_id.eq(event.id),
                participations::user_id.eq(user_id),
                participations::created_at.eq(diesel::dsl::now),
            ))
            .execute(&mut app.conn)
    };

    assert!(join(organizer.id).is_ok());
    let err = join(player.id).unwrap_err();
    assert!(err.to_string().contains("event is full"), "{err}");
    assert_eq!(participants(&mut app.conn, &event), 1);
}

#[test]
fn expiring_past_events() {
    let mut app = test_app();
    let organizer = register(&mut app, "olga@example.com", "Olga");
    register(&mut app, "pat@example.com", "Pat");
    let court = insert_court(&mut app.conn, "Riverside Gym");

    login_as(&app.client, "olga@example.com");
    let past = create_event(&mut app, "/events/new", &event_form(&court, -2, 6, true));
    let future = create_event(&mut app, "/events/new", &event_form(&court, 2, 6, true));

    // only staff may run the job
    assert_eq!(
        post_empty(&app.client, "/admin/events/expire").status(),
        Status::Forbidden
    );
    diesel::update(users::table.filter(users::id.eq(organizer.id)))
        .set(users::is_staff.eq(true))
        .execute(&mut app.conn)
        .unwrap();
    assert_eq!(
        post_empty(&app.client, "/admin/events/expire").status(),
        Status::SeeOther
    );

    let is_expired = |conn: &mut SqliteConnection, event: &Event| {
        events::table
            .filter(events::id.eq(event.id))
            .select(events::is_expired)
            .first::<bool>(conn)
            .unwrap()
    };
    assert!(is_expired(&mut app.conn, &past));
    assert!(!is_expired(&mut app.conn, &future));

    // nothing left to do
    assert_eq!(
        expire_events_before(&mut app.conn, Utc::now().date_naive()).unwrap(),
        0
    );

    login_as(&app.client, "pat@example.com");
    assert_eq!(
        post_empty(&app.client, format!("/events/{}/signup", past.public_id))
            .status(),
        Status::Forbidden
    );
    assert_eq!(
        post_empty(&app.client, format!("/events/{}/quit", past.public_id))
            .status(),
        Status::Forbidden
    );
}

#[test]
fn only_the_initiator_deletes() {
    let mut app = test_app();
    register(&mut app, "olga@example.com", "Olga");
    register(&mut app, "pat@example.com", "Pat");
    let court = insert_court(&mut app.conn, "Riverside Gym");

    login_as(&app.client, "olga@example.com");
    let event = create_event(&mut app, "/events/new", &event_form(&court, 4, 6, true));
    let delete = format!("/events/{}/delete", event.public_id);

    login_as(&app.client, "pat@example.com");
    assert_eq!(post_empty(&app.client, &delete).status(), Status::Forbidden);

    login_as(&app.client, "olga@example.com");
    assert_eq!(post_empty(&app.client, &delete).status(), Status::SeeOther);
    assert_eq!(
        app.client
            .get(format!("/events/{}", event.public_id))
            .dispatch()
            .status(),
        Status::NotFound
    );
}
