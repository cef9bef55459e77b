use chrono::NaiveDate;
use db::{
    schema::users,
    user::{Gender, User},
    DbConn,
};
use diesel::{dsl::now, insert_into, prelude::*};
use maud::{html, Markup};
use rocket::{form::Form, response::Redirect};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{form_error, page_of_body, page_title};

use crate::{
    auth::hash_password,
    permissions::{has_permission, Permission},
    util::gen_uuid,
    util_resp::{
        bad_request, forbidden, see_other_ok, success, StandardResponse,
    },
};

fn signups_disabled_page() -> Markup {
    page_of_body(
        html! {
            (page_title("Signups are currently disabled!"))
            div class="m-3" {
                p {
                    "Please ask the site administrator to enable them, or to
                     create an account for you."
                }
            }
        },
        None,
    )
}

/// Parses the value of an `<input type="date">`, where blank means unset.
pub fn parse_optional_date(value: &str) -> Result<Option<NaiveDate>, ()> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ())
}

pub fn gender_select(selected: i64) -> Markup {
    html! {
        select class="form-select" id="gender" name="gender" {
            @for gender in [Gender::Male, Gender::Female] {
                option value=(gender.code()) selected[gender.code() == selected] {
                    (gender.label())
                }
            }
        }
    }
}

fn register_form(form: Option<&RegisterForm>, error: Option<&str>) -> Markup {
    let email = form.map(|f| f.email.as_str()).unwrap_or_default();
    let first_name = form.map(|f| f.first_name.as_str()).unwrap_or_default();
    let last_name = form.map(|f| f.last_name.as_str()).unwrap_or_default();
    let date_of_birth =
        form.map(|f| f.date_of_birth.as_str()).unwrap_or_default();

    page_of_body(
        html! {
            (page_title("Register"))
            (form_error(error))
            form method="post" action="/register" {
                div class="mb-3" {
                    label for="email" class="form-label" { "Email" }
                    input type="email" class="form-control" id="email" name="email" value=(email) required;
                }
                div class="mb-3" {
                    label for="first_name" class="form-label" { "First name" }
                    input type="text" class="form-control" id="first_name" name="first_name" value=(first_name) required;
                }
                div class="mb-3" {
                    label for="last_name" class="form-label" { "Last name" }
                    input type="text" class="form-control" id="last_name" name="last_name" value=(last_name) required;
                }
                div class="mb-3" {
                    label for="gender" class="form-label" { "Gender" }
                    (gender_select(form.map(|f| f.gender).unwrap_or(Gender::Male.code())))
                }
                div class="mb-3" {
                    label for="date_of_birth" class="form-label" { "Date of birth (optional)" }
                    input type="date" class="form-control" id="date_of_birth" name="date_of_birth" value=(date_of_birth);
                }
                div class="mb-3" {
                    label for="password" class="form-label" { "Password" }
                    input type="password" class="form-control" id="password" name="password" required;
                }
                div class="mb-3" {
                    label for="password2" class="form-label" { "Confirm password" }
                    input type="password" class="form-control" id="password2" name="password2" required;
                }
                button type="submit" class="btn btn-primary" { "Register" }
            }
        },
        None,
    )
}

#[get("/register")]
pub async fn register_page(
    user: Option<User>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    if user.is_some() {
        return see_other_ok(Redirect::to("/settings"));
    }

    let open = db
        .run(|conn| has_permission(None, &Permission::RegisterAsNewUser, conn))
        .instrument(span.0)
        .await?;
    if !open {
        return forbidden(signups_disabled_page());
    }

    success(register_form(None, None))
}

#[derive(FromForm, Serialize, Debug)]
pub struct RegisterForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: i64,
    pub date_of_birth: String,
    pub password: String,
    pub password2: String,
}

#[post("/register", data = "<form>")]
pub async fn do_register(
    user: Option<User>,
    form: Form<RegisterForm>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    if user.is_some() {
        return see_other_ok(Redirect::to("/settings"));
    }

    let form = form.into_inner();
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            if !has_permission(None, &Permission::RegisterAsNewUser, conn)? {
                return forbidden(signups_disabled_page());
            }

            let invalid =
                |msg: &str| bad_request(register_form(Some(&form), Some(msg)));

            let email = User::normalize_email(&form.email);
            if !User::validate_email(&email) {
                return invalid("Error: that email is not valid.");
            }
            if !User::validate_name(&form.first_name)
                || !User::validate_name(&form.last_name)
            {
                return invalid(
                    "Error: names must be between 1 and 30 characters long.",
                );
            }
            let Some(gender) = Gender::from_code(form.gender) else {
                return invalid("Error: please select a gender.");
            };
            let Ok(date_of_birth) = parse_optional_date(&form.date_of_birth)
            else {
                return invalid("Error: that date of birth is not valid.");
            };
            if form.password != form.password2 {
                return invalid("Error: your passwords do not match.");
            }
            if !User::validate_password(&form.password) {
                return invalid(
                    "Error: your password should be at least 8 characters.",
                );
            }

            let taken = diesel::select(diesel::dsl::exists(
                users::table.filter(User::with_email(&email)),
            ))
            .get_result::<bool>(conn)?;
            if taken {
                return invalid(
                    "Error: an account with that email already exists.",
                );
            }

            let password_hash = hash_password(&form.password)?;

            insert_into(users::table)
                .values((
                    users::public_id.eq(gen_uuid().to_string()),
                    users::email.eq(&email),
                    users::password_hash.eq(&password_hash),
                    users::first_name.eq(form.first_name.trim()),
                    users::last_name.eq(form.last_name.trim()),
                    users::gender.eq(gender.code()),
                    users::date_of_birth.eq(date_of_birth),
                    users::created_at.eq(now),
                    users::is_active.eq(true),
                    users::is_staff.eq(false),
                    users::is_superuser.eq(false),
                ))
                .execute(conn)?;

            tracing::info!("Registered a new player");

            see_other_ok(Redirect::to("/login"))
        })
    })
    .instrument(span.0)
    .await
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::parse_optional_date;

    #[test]
    fn blank_dates_are_unset() {
        assert_eq!(parse_optional_date("  "), Ok(None));
        assert_eq!(
            parse_optional_date("1990-07-14"),
            Ok(NaiveDate::from_ymd_opt(1990, 7, 14))
        );
        assert!(parse_optional_date("14/07/1990").is_err());
    }
}
