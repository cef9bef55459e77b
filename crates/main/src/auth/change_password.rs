use std::sync::Arc;

use db::{schema::users, user::User, DbConn};
use diesel::{prelude::*, update};
use email::send_mail;
use maud::{html, Markup};
use rocket::{form::Form, response::Redirect};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{form_error, page_of_body};

use crate::{
    auth::{hash_password, password_matches},
    util_resp::{bad_request, see_other_ok, success, StandardResponse},
};

fn change_password_page(user: User, error: Option<&str>) -> Markup {
    page_of_body(
        html! {
            h1 class="mb-4" { "Change your password" }
            (form_error(error))
            form action="/password_change" method="POST" {
                div class="mb-3" {
                    label for="old_password" class="form-label" { "Current password:" }
                    input type="password" class="form-control" id="old_password" name="old_password" required;
                }
                div class="mb-3" {
                    label for="password" class="form-label" { "New password:" }
                    input type="password" class="form-control" id="password" name="password" required;
                }
                div class="mb-3" {
                    label for="password2" class="form-label" { "Confirm new password:" }
                    input type="password" class="form-control" id="password2" name="password2" required;
                }
                button type="submit" class="btn btn-primary" { "Change password" }
            }
        },
        Some(user),
    )
}

#[get("/password_change")]
pub async fn change_password_form(user: User) -> StandardResponse {
    success(change_password_page(user, None))
}

#[derive(FromForm, Serialize, Debug)]
pub struct ChangePasswordForm {
    pub old_password: String,
    pub password: String,
    pub password2: String,
}

/// Handles password updates for logged in players.
#[post("/password_change", data = "<form>")]
pub async fn do_change_password(
    user: User,
    db: DbConn,
    form: Form<ChangePasswordForm>,
    span: TracingSpan,
) -> StandardResponse {
    if !password_matches(&form.old_password, &user.password_hash) {
        return bad_request(change_password_page(
            user,
            Some("The current password you entered is not correct."),
        ));
    }
    if form.password != form.password2 {
        return bad_request(change_password_page(
            user,
            Some("Those passwords do not match!"),
        ));
    }
    if !User::validate_password(&form.password) {
        return bad_request(change_password_page(
            user,
            Some("Your new password should be at least 8 characters."),
        ));
    }

    let new_password_hash = hash_password(&form.password)?;
    let user_id = user.id;

    let db = Arc::new(db);
    db.run(move |conn| {
        update(users::table.filter(users::id.eq(user_id)))
            .set(users::password_hash.eq(new_password_hash))
            .execute(conn)
    })
    .instrument(span.0.clone())
    .await?;

    tracing::info!(parent: &span.0, "Changed password for player {}", user.public_id);

    let name = user.full_name();
    send_mail(
        vec![(name.as_str(), user.email.as_str())],
        "PlayOne password change",
        &html! {
            p {
                "Your PlayOne password was just changed. If this was not you,
                 please reset your password as soon as possible."
            }
        }
        .into_string(),
        "Your PlayOne password was just changed. If this was not you, please \
         reset your password as soon as possible.",
        db,
    )
    .instrument(span.0)
    .await;

    see_other_ok(Redirect::to("/settings"))
}
