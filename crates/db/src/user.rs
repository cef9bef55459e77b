use chrono::NaiveDate;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use rocket::{
    http::{Cookie, CookieJar, Status},
    outcome::try_outcome,
    request::{self, FromRequest},
    Request,
};
use serde::Serialize;

use crate::{schema, DbConn};

pub const LOGIN_COOKIE: &str = "playone_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male = 1,
    Female = 2,
}

impl Gender {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Gender> {
        match code {
            1 => Some(Gender::Male),
            2 => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// A player account.
#[derive(Debug, Queryable, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub public_id: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: i64,
    pub date_of_birth: Option<NaiveDate>,
    pub mobile_number: String,
    pub created_at: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

type WithPublicId<'a> =
    diesel::dsl::Eq<crate::schema::users::public_id, &'a str>;

type WithEmail<'a> = diesel::dsl::Eq<crate::schema::users::email, &'a str>;

impl User {
    pub fn with_public_id(pid: &str) -> WithPublicId<'_> {
        crate::schema::users::public_id.eq(pid)
    }

    pub fn with_email(email: &str) -> WithEmail<'_> {
        crate::schema::users::email.eq(email)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn short_name(&self) -> &str {
        &self.first_name
    }

    pub fn validate_email(email: &str) -> bool {
        static RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?m)^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
            )
            .expect("email regex is valid")
        });
        email.len() <= 255 && RE.is_match(email)
    }

    /// First and last names: non-empty, at most 30 characters.
    pub fn validate_name(name: &str) -> bool {
        let n = name.trim().chars().count();
        n > 0 && n <= 30
    }

    pub fn validate_password(password: &str) -> bool {
        password.chars().count() >= 8
    }

    /// Mobile numbers may be left blank; otherwise digits and `+-()` only.
    pub fn validate_mobile_number(number: &str) -> bool {
        number.chars().count() <= 30
            && number
                .chars()
                .all(|c| c.is_ascii_digit() || "+-()".contains(c))
    }

    /// Lowercases the domain part, leaving the local part alone.
    pub fn normalize_email(email: &str) -> String {
        let email = email.trim();
        match email.rsplit_once('@') {
            Some((local, domain)) => {
                format!("{local}@{}", domain.to_lowercase())
            }
            None => email.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    CookieMissingOrMalformed,
    NoDatabase,
    Unauthorized,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct LoginSession {
    id: i64,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = AuthError;

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, AuthError> {
        let db = try_outcome!(request
            .guard::<DbConn>()
            .await
            .map_error(|(t, _)| (t, AuthError::NoDatabase)));

        let login_cookie = match request.cookies().get_private(LOGIN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return request::Outcome::Error((
                    Status::Unauthorized,
                    AuthError::CookieMissingOrMalformed,
                ));
            }
        };

        let login: LoginSession =
            match serde_json::from_str(login_cookie.value()) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("Discarding malformed login cookie: {e}");
                    // a malformed cookie would otherwise stop the player
                    // from ever logging in again
                    request.cookies().remove_private(LOGIN_COOKIE);
                    return request::Outcome::Error((
                        Status::Unauthorized,
                        AuthError::CookieMissingOrMalformed,
                    ));
                }
            };

        let user = db
            .run(move |conn| {
                schema::users::table
                    .filter(schema::users::id.eq(login.id))
                    .first::<User>(conn)
                    .optional()
            })
            .await;

        match user {
            Ok(Some(user)) if user.is_active => request::Outcome::Success(user),
            Ok(_) => request::Outcome::Error((
                Status::Unauthorized,
                AuthError::Unauthorized,
            )),
            Err(e) => {
                tracing::error!("Could not load logged in user: {e}");
                request::Outcome::Error((
                    Status::InternalServerError,
                    AuthError::NoDatabase,
                ))
            }
        }
    }
}

pub fn set_login_cookie(id: i64, jar: &CookieJar<'_>) {
    let session = serde_json::to_string(&LoginSession { id })
        .expect("login sessions always serialize");
    jar.add_private(Cookie::new(LOGIN_COOKIE, session));
}

pub fn remove_login_cookie(jar: &CookieJar<'_>) {
    jar.remove_private(LOGIN_COOKIE);
}

#[cfg(test)]
mod tests {
    use super::User;

    #[test]
    fn test_simple_test_email() {
        assert!(User::validate_email("player1@example.com"));
        assert!(!User::validate_email("player1.example.com"));
    }

    #[test]
    fn mobile_numbers() {
        assert!(User::validate_mobile_number(""));
        assert!(User::validate_mobile_number("+44(0)20-7946-0000"));
        assert!(!User::validate_mobile_number("call me"));
    }

    #[test]
    fn email_domain_is_lowercased() {
        assert_eq!(
            User::normalize_email(" Player@Example.COM "),
            "Player@example.com"
        );
    }
}
