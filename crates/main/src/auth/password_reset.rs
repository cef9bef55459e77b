use std::sync::Arc;

use chrono::{Duration, Utc};
use db::{
    password_reset::{PasswordReset, RESET_CODE_LIFETIME_MINUTES},
    schema::{password_resets, users},
    user::User,
    DbConn,
};
use diesel::{dsl::exists, prelude::*, select};
use email::send_mail;
use maud::{html, Markup};
use rocket::{form::Form, response::Redirect, State};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{form_error, page_of_body, page_title};

use crate::{
    auth::hash_password,
    config::AppConfig,
    util::short_random,
    util_resp::{
        bad_request, err_not_found, see_other_ok, success, StandardResponse,
    },
};

fn request_reset_page(error: Option<&str>) -> Markup {
    page_of_body(
        html! {
            (page_title("Reset your password"))
            (form_error(error))
            form method="post" action="/password_reset" {
                div class="mb-3" {
                    label for="email" class="form-label" { "Email" }
                    input name="email" type="email" class="form-control" id="email" required;
                }
                button type="submit" class="btn btn-primary" { "Send reset link" }
            }
        },
        None,
    )
}

fn unknown_code_page() -> Markup {
    ui::error_404(
        Some("That reset link does not exist, has expired, or has already been used."),
        None,
    )
}

#[get("/password_reset")]
pub async fn password_reset_page() -> StandardResponse {
    success(request_reset_page(None))
}

#[derive(FromForm, Serialize, Debug)]
pub struct RequestResetForm {
    pub email: String,
}

#[post("/password_reset", data = "<form>")]
pub async fn do_request_password_reset(
    form: Form<RequestResetForm>,
    db: DbConn,
    config: &State<AppConfig>,
    span: TracingSpan,
) -> StandardResponse {
    let db = Arc::new(db);
    let email = User::normalize_email(&form.email);

    let issued = db
        .run(move |conn| {
            conn.transaction(|conn| -> QueryResult<Option<(User, String)>> {
                let user = users::table
                    .filter(User::with_email(&email))
                    .filter(users::is_active.eq(true))
                    .first::<User>(conn)
                    .optional()?;
                let Some(user) = user else {
                    return Ok(None);
                };

                let code = short_random(32);
                let now = Utc::now().naive_utc();
                diesel::insert_into(password_resets::table)
                    .values((
                        password_resets::code.eq(&code),
                        password_resets::user_id.eq(user.id),
                        password_resets::created_at.eq(now),
                        password_resets::expires_at.eq(
                            now + Duration::minutes(RESET_CODE_LIFETIME_MINUTES),
                        ),
                        password_resets::already_used.eq(false),
                    ))
                    .execute(conn)?;

                Ok(Some((user, code)))
            })
        })
        .instrument(span.0.clone())
        .await?;

    // the response is the same whether or not the account exists
    if let Some((user, code)) = issued {
        let link = config.link(&format!("/reset/{code}"));
        let name = user.full_name();
        let html = html! {
            p { "Dear " (name) "," }
            p {
                "Please use this link to choose a new password for PlayOne: "
                a href=(link) { (link) }
            }
            p { "The link stops working after " (RESET_CODE_LIFETIME_MINUTES) " minutes." }
        };
        let text = format!(
            "Dear {name},\n\nPlease use this link to choose a new password \
             for PlayOne:\n\n{link}\n\nThe link stops working after \
             {RESET_CODE_LIFETIME_MINUTES} minutes.\n"
        );
        send_mail(
            vec![(name.as_str(), user.email.as_str())],
            "Reset your PlayOne password",
            &html.into_string(),
            &text,
            db,
        )
        .instrument(span.0)
        .await;
    }

    success(page_of_body(
        html! {
            h1 { "Email sent" }
            p { "If an account exists for that address, we have sent it a link to reset the password." }
        },
        None,
    ))
}

fn new_password_form(code: &str, error: Option<&str>) -> Markup {
    page_of_body(
        html! {
            (page_title("Choose a new password"))
            (form_error(error))
            form method="post" action=(format!("/reset/{code}")) {
                div class="mb-3" {
                    label for="password" class="form-label" { "New password" }
                    input type="password" class="form-control" id="password" name="password" required;
                }
                div class="mb-3" {
                    label for="password2" class="form-label" { "Confirm new password" }
                    input type="password" class="form-control" id="password2" name="password2" required;
                }
                button type="submit" class="btn btn-primary" { "Set password" }
            }
        },
        None,
    )
}

#[get("/reset/<code>")]
pub async fn reset_with_code_page(
    code: String,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    let code2 = code.clone();
    let code_exists = db
        .run(move |conn| {
            select(exists(
                password_resets::table
                    .filter(PasswordReset::valid_with_code(&code2)),
            ))
            .get_result::<bool>(conn)
        })
        .instrument(span.0)
        .await?;

    if !code_exists {
        return err_not_found(unknown_code_page());
    }

    success(new_password_form(&code, None))
}

#[derive(FromForm, Serialize, Debug)]
pub struct NewPasswordForm {
    pub password: String,
    pub password2: String,
}

#[post("/reset/<code>", data = "<form>")]
pub async fn do_reset_with_code(
    code: String,
    form: Form<NewPasswordForm>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    if form.password != form.password2 {
        return bad_request(new_password_form(
            &code,
            Some("Those passwords do not match!"),
        ));
    }
    if !User::validate_password(&form.password) {
        return bad_request(new_password_form(
            &code,
            Some("Your new password should be at least 8 characters."),
        ));
    }
    let password_hash = hash_password(&form.password)?;

    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            let reset = password_resets::table
                .filter(PasswordReset::valid_with_code(&code))
                .first::<PasswordReset>(conn)
                .optional()?;
            let Some(reset) = reset else {
                return err_not_found(unknown_code_page());
            };

            diesel::update(
                password_resets::table
                    .filter(password_resets::id.eq(reset.id)),
            )
            .set(password_resets::already_used.eq(true))
            .execute(conn)?;

            diesel::update(users::table.filter(users::id.eq(reset.user_id)))
                .set(users::password_hash.eq(&password_hash))
                .execute(conn)?;

            tracing::info!("Reset the password of a player");

            see_other_ok(Redirect::to("/login"))
        })
    })
    .instrument(span.0)
    .await
}
