use db::{
    schema::users,
    user::{Gender, User},
    DbConn,
};
use diesel::prelude::*;
use maud::Markup;
use rocket::{form::Form, response::Redirect};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{error_403, form_error, page_of_body, page_title};

use crate::{
    auth::{hash_password, register::gender_select},
    util::gen_uuid,
    util_resp::{
        bad_request, forbidden, see_other_ok, success, StandardResponse,
    },
};

fn setup_page_form(error: Option<&str>) -> Markup {
    page_of_body(
        maud::html! {
            (page_title("Create the administrator account"))
            (form_error(error))
            form method="POST" class="container" action="/admin/setup" {
                div class="mb-3" {
                    label for="email" class="form-label" { "Email" }
                    input type="email" class="form-control" id="email" name="email" required;
                }
                div class="mb-3" {
                    label for="first_name" class="form-label" { "First name" }
                    input type="text" class="form-control" id="first_name" name="first_name" required;
                }
                div class="mb-3" {
                    label for="last_name" class="form-label" { "Last name" }
                    input type="text" class="form-control" id="last_name" name="last_name" required;
                }
                div class="mb-3" {
                    label for="gender" class="form-label" { "Gender" }
                    (gender_select(Gender::Male.code()))
                }
                div class="mb-3" {
                    label for="password" class="form-label" { "Password" }
                    input type="password" class="form-control" id="password" name="password" required;
                }
                div class="mb-3" {
                    label for="password2" class="form-label" { "Password confirmation" }
                    input type="password" class="form-control" id="password2" name="password2" required;
                }
                button type="submit" class="btn btn-primary" { "Create Admin Account" }
            }
        },
        None,
    )
}

fn already_set_up() -> StandardResponse {
    forbidden(error_403(
        Some("Error: setup has already been performed!"),
        None,
    ))
}

/// Page to create the first user. Only reachable while nobody has
/// registered.
#[get("/admin/setup")]
pub async fn setup_page(db: DbConn, span: TracingSpan) -> StandardResponse {
    let user_count = db
        .run(|conn| users::table.count().get_result::<i64>(conn))
        .instrument(span.0)
        .await?;

    if user_count > 0 {
        return already_set_up();
    }

    success(setup_page_form(None))
}

#[derive(FromForm, Serialize, Debug)]
pub struct SetupForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: i64,
    pub password: String,
    pub password2: String,
}

/// Creates a superuser. This is only permitted if no users currently exist in
/// the system.
#[post("/admin/setup", data = "<form>")]
pub async fn do_setup(
    db: DbConn,
    form: Form<SetupForm>,
    span: TracingSpan,
) -> StandardResponse {
    let form = form.into_inner();
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            let user_count = users::table.count().get_result::<i64>(conn)?;
            if user_count > 0 {
                return already_set_up();
            }

            let email = User::normalize_email(&form.email);
            if form.password != form.password2 {
                return bad_request(setup_page_form(Some(
                    "Error: those passwords do not match!",
                )));
            }
            if !User::validate_email(&email) {
                return bad_request(setup_page_form(Some(
                    "Error: your email is not a valid email.",
                )));
            }
            if !User::validate_name(&form.first_name)
                || !User::validate_name(&form.last_name)
            {
                return bad_request(setup_page_form(Some(
                    "Error: names must be between 1 and 30 characters long.",
                )));
            }
            let Some(gender) = Gender::from_code(form.gender) else {
                return bad_request(setup_page_form(Some(
                    "Error: please select a gender.",
                )));
            };
            if !User::validate_password(&form.password) {
                return bad_request(setup_page_form(Some(
                    "Error: your password should be at least 8 characters.",
                )));
            }

            let password_hash = hash_password(&form.password)?;

            diesel::insert_into(users::table)
                .values((
                    users::public_id.eq(gen_uuid().to_string()),
                    users::email.eq(&email),
                    users::password_hash.eq(password_hash),
                    users::first_name.eq(form.first_name.trim()),
                    users::last_name.eq(form.last_name.trim()),
                    users::gender.eq(gender.code()),
                    users::created_at.eq(diesel::dsl::now),
                    users::is_active.eq(true),
                    users::is_staff.eq(true),
                    users::is_superuser.eq(true),
                ))
                .execute(conn)?;

            tracing::info!("Created the first superuser");

            see_other_ok(Redirect::to("/login"))
        })
    })
    .instrument(span.0)
    .await
}
