use chrono::Utc;
use db::{
    schema::users,
    user::{set_login_cookie, User},
    DbConn,
};
use diesel::prelude::*;
use maud::{html, Markup};
use rocket::{form::Form, http::CookieJar, response::Redirect};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{form_error, page_of_body, page_title};

use crate::{
    auth::password_matches,
    util_resp::{see_other_ok, success, FailureResponse, StandardResponse},
};

fn login_form(error: Option<&str>, email: &str) -> Markup {
    page_of_body(
        html! {
            (page_title("Log in"))
            (form_error(error))
            form method="post" action="/login" {
                div class="mb-3" {
                    label for="email" class="form-label" { "Email address" }
                    input type="email" class="form-control" id="email" name="email" value=(email) required;
                }
                div class="mb-3" {
                    label for="password" class="form-label" { "Password" }
                    input type="password" class="form-control" id="password" name="password" required;
                }
                button type="submit" class="btn btn-primary" { "Log in" }
            }
            p class="mt-3" {
                a href="/register" { "Register for a new account" }
                " or "
                a href="/password_reset" { "reset your password" }
                "."
            }
        },
        None,
    )
}

#[get("/login")]
pub async fn login_page(user: Option<User>) -> StandardResponse {
    if user.is_some() {
        return see_other_ok(Redirect::to("/"));
    }

    success(login_form(None, ""))
}

#[derive(FromForm, Serialize, Debug)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[post("/login", data = "<form>")]
pub async fn do_login(
    user: Option<User>,
    form: Form<LoginForm>,
    jar: &CookieJar<'_>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    if user.is_some() {
        return see_other_ok(Redirect::to("/"));
    }

    let id = db
        .run(move |conn| -> Result<i64, FailureResponse> {
            let email = User::normalize_email(&form.email);
            let user = users::table
                .filter(User::with_email(&email))
                .first::<User>(conn)
                .optional()?;

            let user = match user {
                Some(user)
                    if user.is_active
                        && password_matches(
                            &form.password,
                            &user.password_hash,
                        ) =>
                {
                    user
                }
                _ => {
                    tracing::info!("Rejected login attempt");
                    return Err(FailureResponse::BadRequest(login_form(
                        Some("Incorrect email or password."),
                        &form.email,
                    )));
                }
            };

            diesel::update(users::table.filter(users::id.eq(user.id)))
                .set(users::last_login.eq(Some(Utc::now().naive_utc())))
                .execute(conn)?;

            Ok(user.id)
        })
        .instrument(span.0)
        .await?;

    set_login_cookie(id, jar);
    see_other_ok(Redirect::to("/"))
}
