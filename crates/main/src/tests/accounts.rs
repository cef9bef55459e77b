use db::{
    config::DISABLE_SIGNUPS,
    password_reset::PasswordReset,
    schema::{config, password_resets, users},
};
use diesel::prelude::*;
use rocket::http::Status;

use super::{login_as, post_empty, post_form, register, test_app, PASSWORD};
use crate::{
    auth::{
        login::LoginForm,
        password_reset::{NewPasswordForm, RequestResetForm},
        register::RegisterForm,
    },
    util::gen_uuid,
};

#[test]
fn pages_for_players_send_visitors_to_login() {
    let app = test_app();
    for uri in ["/groups/new", "/events/new", "/settings"] {
        let response = app.client.get(uri).dispatch();
        assert_eq!(response.status(), Status::SeeOther, "{uri}");
        assert_eq!(response.headers().get_one("Location"), Some("/login"));
    }
}

#[test]
fn wrong_password_is_rejected() {
    let mut app = test_app();
    register(&mut app, "olga@example.com", "Olga");

    let response = post_form(
        &app.client,
        "/login",
        &LoginForm {
            email: "olga@example.com".to_string(),
            password: "not-the-password".to_string(),
        },
    );
    assert_eq!(response.status(), Status::BadRequest);
}

#[test]
fn emails_are_unique_regardless_of_domain_case() {
    let mut app = test_app();
    register(&mut app, "olga@example.com", "Olga");

    let response = post_form(
        &app.client,
        "/register",
        &RegisterForm {
            email: "olga@EXAMPLE.com".to_string(),
            first_name: "Another".to_string(),
            last_name: "Olga".to_string(),
            gender: 2,
            date_of_birth: "1990-07-14".to_string(),
            password: PASSWORD.to_string(),
            password2: PASSWORD.to_string(),
        },
    );
    assert_eq!(response.status(), Status::BadRequest);
    let n = users::table
        .count()
        .get_result::<i64>(&mut app.conn)
        .unwrap();
    assert_eq!(n, 1);
}

#[test]
fn closed_signups_refuse_registration() {
    let mut app = test_app();
    diesel::insert_into(config::table)
        .values((
            config::public_id.eq(gen_uuid().to_string()),
            config::key.eq(DISABLE_SIGNUPS),
            config::value.eq("1"),
        ))
        .execute(&mut app.conn)
        .unwrap();

    assert_eq!(
        app.client.get("/register").dispatch().status(),
        Status::Forbidden
    );
    let status = post_form(
        &app.client,
        "/register",
        &RegisterForm {
            email: "olga@example.com".to_string(),
            first_name: "Olga".to_string(),
            last_name: "Tester".to_string(),
            gender: 2,
            date_of_birth: String::new(),
            password: PASSWORD.to_string(),
            password2: PASSWORD.to_string(),
        },
    )
    .status();
    assert_eq!(status, Status::Forbidden);
    let n = users::table
        .count()
        .get_result::<i64>(&mut app.conn)
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn password_reset_codes_work_once() {
    let mut app = test_app();
    register(&mut app, "olga@example.com", "Olga");

    // unknown addresses get the same answer
    for email in ["olga@example.com", "nobody@example.com"] {
        let status = post_form(
            &app.client,
            "/password_reset",
            &RequestResetForm {
                email: email.to_string(),
            },
        )
        .status();
        assert_eq!(status, Status::Ok);
    }

    let reset = password_resets::table
        .first::<PasswordReset>(&mut app.conn)
        .unwrap();
    let uri = format!("/reset/{}", reset.code);
    assert_eq!(app.client.get(uri.as_str()).dispatch().status(), Status::Ok);

    let new_password = "a-brand-new-password";
    let form = NewPasswordForm {
        password: new_password.to_string(),
        password2: new_password.to_string(),
    };
    assert_eq!(post_form(&app.client, &uri, &form).status(), Status::SeeOther);
    assert_eq!(post_form(&app.client, &uri, &form).status(), Status::NotFound);

    post_empty(&app.client, "/logout");
    let old = post_form(
        &app.client,
        "/login",
        &LoginForm {
            email: "olga@example.com".to_string(),
            password: PASSWORD.to_string(),
        },
    )
    .status();
    assert_eq!(old, Status::BadRequest);
    let new = post_form(
        &app.client,
        "/login",
        &LoginForm {
            email: "olga@example.com".to_string(),
            password: new_password.to_string(),
        },
    )
    .status();
    assert_eq!(new, Status::SeeOther);
}

#[test]
fn first_account_is_a_superuser() {
    use crate::admin::setup::SetupForm;

    let mut app = test_app();
    assert_eq!(app.client.get("/admin/setup").dispatch().status(), Status::Ok);

    let form = SetupForm {
        email: "root@example.com".to_string(),
        first_name: "Root".to_string(),
        last_name: "Admin".to_string(),
        gender: 1,
        password: PASSWORD.to_string(),
        password2: PASSWORD.to_string(),
    };
    assert_eq!(
        post_form(&app.client, "/admin/setup", &form).status(),
        Status::SeeOther
    );
    let is_superuser = users::table
        .filter(users::email.eq("root@example.com"))
        .select(users::is_superuser)
        .first::<bool>(&mut app.conn)
        .unwrap();
    assert!(is_superuser);

    // setup only runs once
    assert_eq!(
        post_form(&app.client, "/admin/setup", &form).status(),
        Status::Forbidden
    );

    login_as(&app.client, "root@example.com");
    assert_eq!(app.client.get("/admin/config").dispatch().status(), Status::Ok);
    assert_eq!(app.client.get("/").dispatch().status(), Status::Ok);
}

#[test]
fn social_profile_fills_in_gender_and_birthday() {
    use chrono::NaiveDate;
    use db::{
        social::{apply_enrichment, enrichment_from_profile},
        user::{Gender, User},
    };

    let mut app = test_app();
    let player = register(&mut app, "olga@example.com", "Olga");
    assert_eq!(player.gender, Gender::Male.code());

    let profile = serde_json::json!({"gender": "female", "birthday": "07/14/1990"});
    let enrichment = enrichment_from_profile("facebook", &profile).unwrap();
    apply_enrichment(&mut app.conn, player.id, enrichment).unwrap();

    let player = users::table
        .filter(users::id.eq(player.id))
        .first::<User>(&mut app.conn)
        .unwrap();
    assert_eq!(player.gender, Gender::Female.code());
    assert_eq!(player.date_of_birth, NaiveDate::from_ymd_opt(1990, 7, 14));
}
