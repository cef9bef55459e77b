use chrono::{NaiveDate, Utc};
use db::{schema::events, user::User, DbConn};
use diesel::prelude::*;
use rocket::response::Redirect;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::error_403;

use crate::{
    permissions::{has_permission, Permission},
    util_resp::{forbidden, see_other_ok, StandardResponse},
};

/// Marks every unexpired event played before `today` as expired, returning
/// how many were changed.
pub fn expire_events_before(
    conn: &mut SqliteConnection,
    today: NaiveDate,
) -> QueryResult<usize> {
    diesel::update(
        events::table
            .filter(events::is_expired.eq(false))
            .filter(events::play_date.lt(today)),
    )
    .set(events::is_expired.eq(true))
    .execute(conn)
}

#[post("/admin/events/expire")]
pub async fn do_expire_events(
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            if !has_permission(Some(&user), &Permission::StaffAction, conn)? {
                return forbidden(error_403(
                    Some("Error: only staff may expire events."),
                    Some(user),
                ));
            }

            let n = expire_events_before(conn, Utc::now().date_naive())?;
            tracing::info!("Marked {n} events as expired");

            see_other_ok(Redirect::to("/admin"))
        })
    })
    .instrument(span.0)
    .await
}
