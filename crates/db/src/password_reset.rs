use chrono::{NaiveDateTime, Utc};
use diesel::{prelude::*, sql_types::Bool, sqlite::Sqlite};

use crate::schema::password_resets;

/// How long a reset code stays usable.
pub const RESET_CODE_LIFETIME_MINUTES: i64 = 30;

#[derive(Debug, Queryable)]
pub struct PasswordReset {
    pub id: i64,
    pub code: String,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub already_used: bool,
}

impl PasswordReset {
    pub fn valid_with_code<'a>(
        code: &'a str,
    ) -> Box<
        dyn BoxableExpression<password_resets::table, Sqlite, SqlType = Bool>
            + 'a,
    > {
        Box::new(
            password_resets::code
                .eq(code)
                .and(password_resets::expires_at.gt(Utc::now().naive_utc()))
                .and(password_resets::already_used.eq(false)),
        )
    }
}
