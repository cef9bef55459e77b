use db::{schema::users, user::User, DbConn};
use diesel::prelude::*;
use maud::{html, Markup};
use rocket::{form::Form, response::Redirect};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{form_error, page_of_body, page_title};

use crate::{
    auth::register::parse_optional_date,
    util_resp::{bad_request, see_other_ok, success, StandardResponse},
};

fn settings_form(
    user: User,
    form: Option<&SettingsForm>,
    error: Option<&str>,
) -> Markup {
    let first_name = form
        .map(|f| f.first_name.clone())
        .unwrap_or_else(|| user.first_name.clone());
    let last_name = form
        .map(|f| f.last_name.clone())
        .unwrap_or_else(|| user.last_name.clone());
    let date_of_birth = form.map(|f| f.date_of_birth.clone()).unwrap_or_else(|| {
        user.date_of_birth
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    });
    let mobile_number = form
        .map(|f| f.mobile_number.clone())
        .unwrap_or_else(|| user.mobile_number.clone());

    page_of_body(
        html! {
            (page_title("Settings"))
            (form_error(error))
            p { "Signed in as " strong { (user.email) } "." }
            form method="post" action="/settings" {
                div class="mb-3" {
                    label for="first_name" class="form-label" { "First name" }
                    input type="text" class="form-control" id="first_name" name="first_name" value=(first_name) required;
                }
                div class="mb-3" {
                    label for="last_name" class="form-label" { "Last name" }
                    input type="text" class="form-control" id="last_name" name="last_name" value=(last_name) required;
                }
                div class="mb-3" {
                    label for="date_of_birth" class="form-label" { "Date of birth" }
                    input type="date" class="form-control" id="date_of_birth" name="date_of_birth" value=(date_of_birth);
                }
                div class="mb-3" {
                    label for="mobile_number" class="form-label" { "Mobile number" }
                    input type="tel" class="form-control" id="mobile_number" name="mobile_number" value=(mobile_number);
                }
                button type="submit" class="btn btn-primary" { "Save" }
            }
            p class="mt-3" {
                a href="/password_change" { "Change password" }
            }
        },
        Some(user),
    )
}

#[get("/settings")]
pub async fn settings_page(user: User) -> StandardResponse {
    success(settings_form(user, None, None))
}

#[derive(FromForm, Serialize, Debug)]
pub struct SettingsForm {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub mobile_number: String,
}

#[post("/settings", data = "<form>")]
pub async fn do_update_settings(
    user: User,
    form: Form<SettingsForm>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    let form = form.into_inner();

    if !User::validate_name(&form.first_name)
        || !User::validate_name(&form.last_name)
    {
        return bad_request(settings_form(
            user,
            Some(&form),
            Some("Error: names must be between 1 and 30 characters long."),
        ));
    }
    let Ok(date_of_birth) = parse_optional_date(&form.date_of_birth) else {
        return bad_request(settings_form(
            user,
            Some(&form),
            Some("Error: that date of birth is not valid."),
        ));
    };
    let mobile_number = form.mobile_number.trim();
    if !User::validate_mobile_number(mobile_number) {
        return bad_request(settings_form(
            user,
            Some(&form),
            Some("Error: mobile numbers may only contain digits and +-()."),
        ));
    }

    let mobile_number = mobile_number.to_string();
    db.run(move |conn| {
        diesel::update(users::table.filter(users::id.eq(user.id)))
            .set((
                users::first_name.eq(form.first_name.trim()),
                users::last_name.eq(form.last_name.trim()),
                users::date_of_birth.eq(date_of_birth),
                users::mobile_number.eq(&mobile_number),
            ))
            .execute(conn)
    })
    .instrument(span.0)
    .await?;

    see_other_ok(Redirect::to("/settings"))
}
