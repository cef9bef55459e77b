use db::{user::User, DbConn};
use maud::html;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{action_button, error_403, page_of_body, page_title};

use crate::{
    permissions::{has_permission, Permission},
    util_resp::{forbidden, success, StandardResponse},
};

pub mod config;
pub mod expire;
pub mod setup;

#[get("/admin")]
pub async fn admin_overview(
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    let user2 = user.clone();
    let (is_staff, is_superuser) = db
        .run(move |conn| -> diesel::QueryResult<_> {
            Ok((
                has_permission(Some(&user2), &Permission::StaffAction, conn)?,
                has_permission(
                    Some(&user2),
                    &Permission::ModifyGlobalConfig,
                    conn,
                )?,
            ))
        })
        .instrument(span.0)
        .await?;

    if !is_staff {
        return forbidden(error_403(
            Some("Error: you are not authorized to view this page"),
            Some(user),
        ));
    }

    success(page_of_body(
        html! {
            (page_title("Admin page"))
            ul class="list-group" {
                @if is_superuser {
                    li class="list-group-item" {
                        a href="/admin/config" { "Site configuration" }
                    }
                }
                li class="list-group-item" {
                    "Mark every event whose play date has passed as expired: "
                    (action_button("/admin/events/expire", "Expire past events", "btn-warning"))
                }
            }
        },
        Some(user),
    ))
}
