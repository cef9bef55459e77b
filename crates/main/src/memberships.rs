//! Approving, promoting, demoting and removing group members.

use db::{
    group::{role_in_group, Group, Membership},
    role::{check_transition, MembershipAction},
    schema::{groups, memberships},
    user::User,
    DbConn,
};
use diesel::prelude::*;
use rocket::response::Redirect;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{error_403, error_404};

use crate::util_resp::{err_not_found, forbidden, see_other_ok, StandardResponse};

/// Checks that `user` may apply `action` to the membership, then applies it.
/// The check and the write share one transaction.
fn apply_membership_action(
    conn: &mut SqliteConnection,
    user: User,
    membership_id: &str,
    action: MembershipAction,
) -> StandardResponse {
    conn.transaction(|conn| -> StandardResponse {
        let Some(target) = Membership::load_by_public_id(conn, membership_id)?
        else {
            return err_not_found(error_404(
                Some("No such membership."),
                Some(user),
            ));
        };
        let group = groups::table
            .filter(groups::id.eq(target.group_id))
            .first::<Group>(conn)?;

        let caller = role_in_group(conn, group.id, user.id)?;
        if let Err(e) = check_transition(caller, target.role, action) {
            tracing::info!(
                "Refused {action:?} on membership {} ({e})",
                target.public_id
            );
            return forbidden(error_403(Some(e), Some(user)));
        }

        let target_row = memberships::table.filter(memberships::id.eq(target.id));
        match action.resulting_role() {
            Some(role) if role == target.role => (),
            Some(role) => {
                diesel::update(target_row)
                    .set(memberships::role.eq(role.as_str()))
                    .execute(conn)?;
                tracing::info!(
                    "Membership {} is now {role} (was {})",
                    target.public_id,
                    target.role
                );
            }
            None => {
                diesel::delete(target_row).execute(conn)?;
                tracing::info!("Removed membership {}", target.public_id);
            }
        }

        see_other_ok(Redirect::to(format!("/groups/{}", group.public_id)))
    })
}

/// Approves a join request, or demotes an admin.
#[post("/memberships/<membership_id>/member")]
pub async fn do_make_member(
    membership_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| {
        apply_membership_action(conn, user, &membership_id, MembershipAction::MakeMember)
    })
    .instrument(span.0)
    .await
}

#[post("/memberships/<membership_id>/admin")]
pub async fn do_make_admin(
    membership_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| {
        apply_membership_action(conn, user, &membership_id, MembershipAction::MakeAdmin)
    })
    .instrument(span.0)
    .await
}

#[post("/memberships/<membership_id>/delete")]
pub async fn do_remove_membership(
    membership_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| {
        apply_membership_action(conn, user, &membership_id, MembershipAction::Remove)
    })
    .instrument(span.0)
    .await
}
