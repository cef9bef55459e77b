use db::{
    court::Court,
    event::{Event, Viewer},
    group::{role_in_group, Group, Membership},
    role::{check_transition, MembershipAction, Role},
    schema::{courts, events, groups, memberships, users},
    user::User,
    DbConn,
};
use diesel::{
    dsl::{exists, insert_into, select},
    prelude::*,
};
use maud::{html, Markup};
use rocket::{
    form::{Form, FromForm},
    response::Redirect,
    State,
};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{action_button, error_403, error_404, form_error, page_of_body, page_title};

use crate::{
    cache::PageCache,
    courts::court_select,
    events::event_table,
    permissions::{has_permission, GroupRef, Permission},
    util::gen_uuid,
    util_resp::{
        bad_request, err_not_found, forbidden, see_other_ok, success,
        StandardResponse,
    },
};

#[get("/groups")]
pub async fn list_groups(
    user: Option<User>,
    db: DbConn,
    cache: &State<PageCache>,
    span: TracingSpan,
) -> StandardResponse {
    let groups = match cache.groups.get() {
        Some(groups) => groups,
        None => {
            let groups =
                db.run(|conn| Group::load_all(conn)).instrument(span.0).await?;
            cache.groups.put(groups.clone());
            groups
        }
    };

    success(page_of_body(
        html! {
            (page_title("Groups"))
            @if user.is_some() {
                a class="btn btn-primary mb-3" href="/groups/new" { "Create a group" }
            }
            @if groups.is_empty() {
                p { "There are no groups yet." }
            } @else {
                ul class="list-group" {
                    @for group in &groups {
                        li class="list-group-item" {
                            a href=(format!("/groups/{}", group.public_id)) { (group.name) }
                        }
                    }
                }
            }
        },
        user,
    ))
}

fn create_group_form(
    courts: &[Court],
    form: Option<&CreateGroupForm>,
    error: Option<&str>,
) -> Markup {
    let name = form.map(|f| f.name.as_str()).unwrap_or_default();
    let about = form.map(|f| f.about.as_str()).unwrap_or_default();
    html! {
        (page_title("Create a group"))
        (form_error(error))
        @if courts.is_empty() {
            p {
                "A group needs a home court. "
                a href="/courts/new" { "Add a court" }
                " first."
            }
        } @else {
            form method="post" action="/groups/new" {
                div class="mb-3" {
                    label for="name" class="form-label" { "Name" }
                    input type="text" class="form-control" id="name" name="name" value=(name) required;
                }
                div class="mb-3" {
                    label for="court" class="form-label" { "Court" }
                    (court_select(courts, form.map(|f| f.court.as_str())))
                }
                div class="mb-3" {
                    label for="about" class="form-label" { "About" }
                    textarea class="form-control" id="about" name="about" rows="4" { (about) }
                }
                button type="submit" class="btn btn-primary" { "Create" }
            }
        }
    }
}

#[get("/groups/new")]
pub async fn create_group_page(
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    let courts = db.run(|conn| Court::load_all(conn)).instrument(span.0).await?;
    success(page_of_body(create_group_form(&courts, None, None), Some(user)))
}

#[derive(FromForm, Serialize, Debug)]
pub struct CreateGroupForm {
    pub name: String,
    /// Public id of the group's court.
    pub court: String,
    pub about: String,
}

/// Creates the group and its organizer's membership together.
#[post("/groups/new", data = "<form>")]
pub async fn do_create_group(
    user: User,
    form: Form<CreateGroupForm>,
    db: DbConn,
    cache: &State<PageCache>,
    span: TracingSpan,
) -> StandardResponse {
    let form = form.into_inner();
    let ret = db
        .run(move |conn| {
            conn.transaction(|conn| -> StandardResponse {
                let courts = Court::load_all(conn)?;
                let invalid = |msg: &str| {
                    bad_request(page_of_body(
                        create_group_form(&courts, Some(&form), Some(msg)),
                        Some(user.clone()),
                    ))
                };

                let name = form.name.trim();
                if !Group::validate_name(name) {
                    return invalid(
                        "Error: group names must be between 1 and 50 characters long.",
                    );
                }
                if !Group::validate_about(&form.about) {
                    return invalid(
                        "Error: the description may be at most 600 characters long.",
                    );
                }
                let Some(court) =
                    courts.iter().find(|court| court.public_id == form.court)
                else {
                    return invalid("Error: please choose a court.");
                };

                let name_taken =
                    select(exists(groups::table.filter(groups::name.eq(name))))
                        .get_result::<bool>(conn)?;
                if name_taken {
                    return invalid(
                        "Error: a group with that name already exists. Please choose a different name.",
                    );
                }

                let group_public_id = gen_uuid().to_string();
                let group_id = insert_into(groups::table)
                    .values((
                        groups::public_id.eq(&group_public_id),
                        groups::name.eq(name),
                        groups::organizer_id.eq(user.id),
                        groups::court_id.eq(court.id),
                        groups::about.eq(&form.about),
                        groups::created_at.eq(diesel::dsl::now),
                    ))
                    .returning(groups::id)
                    .get_result::<i64>(conn)?;

                insert_into(memberships::table)
                    .values((
                        memberships::public_id.eq(gen_uuid().to_string()),
                        memberships::group_id.eq(group_id),
                        memberships::user_id.eq(user.id),
                        memberships::role.eq(Role::Organizer.as_str()),
                        memberships::created_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)?;

                tracing::info!("Created group {group_public_id}");

                see_other_ok(Redirect::to(format!("/groups/{group_public_id}")))
            })
        })
        .instrument(span.0)
        .await;

    if ret.is_ok() {
        cache.groups.invalidate();
    }
    ret
}

/// Buttons for what the viewer may do to `membership`.
fn membership_actions(caller: Option<Role>, membership: &Membership) -> Markup {
    let allowed = |action| check_transition(caller, membership.role, action).is_ok();
    let base = format!("/memberships/{}", membership.public_id);
    html! {
        @if membership.role != Role::Member && allowed(MembershipAction::MakeMember) {
            (action_button(
                &format!("{base}/member"),
                if membership.role == Role::Pending { "Approve" } else { "Make member" },
                "btn-success",
            ))
        }
        @if membership.role != Role::Admin && allowed(MembershipAction::MakeAdmin) {
            (action_button(&format!("{base}/admin"), "Make admin", "btn-primary"))
        }
        @if allowed(MembershipAction::Remove) {
            (action_button(&format!("{base}/delete"), "Remove", "btn-danger"))
        }
    }
}

#[get("/groups/<group_id>")]
pub async fn view_group(
    group_id: String,
    user: Option<User>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| -> StandardResponse {
        let Some(group) = Group::load_by_public_id(conn, &group_id)? else {
            return err_not_found(error_404(Some("No such group."), user));
        };

        let court = courts::table
            .filter(courts::id.eq(group.court_id))
            .first::<Court>(conn)?;
        let organizer = users::table
            .filter(users::id.eq(group.organizer_id))
            .first::<User>(conn)?;
        let memberships = group.memberships_with_players(conn)?;

        let viewer = Viewer {
            user_id: user.as_ref().map(|user| user.id),
            group_role: match &user {
                Some(user) => role_in_group(conn, group.id, user.id)?,
                None => None,
            },
        };

        let group_events = events::table
            .inner_join(courts::table)
            .filter(events::group_id.eq(group.id))
            .filter(events::is_expired.eq(false))
            .order_by((events::play_date.asc(), events::play_start_time.asc()))
            .load::<(Event, Court)>(conn)?
            .into_iter()
            .filter(|(event, _)| event.is_viewable_by(&viewer))
            .collect::<Vec<_>>();

        let base = format!("/groups/{}", group.public_id);
        let markup = html! {
            (page_title(&group.name))
            p {
                "Organized by " strong { (organizer.full_name()) }
                " at "
                a href=(format!("/courts/{}", court.public_id)) { (court.name) }
                "."
            }
            @if !group.about.is_empty() {
                p style="white-space: pre-wrap" { (group.about) }
            }
            div class="mb-3" {
                @if viewer.user_id.is_some() {
                    @match viewer.group_role {
                        None => {
                            (action_button(&format!("{base}/join"), "Request to join", "btn-primary"))
                        }
                        Some(Role::Pending) => {
                            span class="badge text-bg-secondary m-1" { "Join request pending" }
                            (action_button(&format!("{base}/quit"), "Cancel request", "btn-outline-danger"))
                        }
                        Some(Role::Organizer) => {
                            a class="btn btn-sm btn-secondary m-1" href=(format!("{base}/edit")) { "Edit" }
                            (action_button(&format!("{base}/delete"), "Delete group", "btn-danger"))
                        }
                        Some(_) => {
                            (action_button(&format!("{base}/quit"), "Leave group", "btn-outline-danger"))
                        }
                    }
                }
                @if viewer.group_role.is_some_and(Role::is_member) {
                    a class="btn btn-sm btn-primary m-1" href=(format!("{base}/events/new")) { "Schedule an event" }
                }
            }

            h3 { "Events" }
            (event_table(&group_events))

            h3 { "Members" }
            table class="table" {
                thead {
                    tr {
                        th scope="col" { "Name" }
                        th scope="col" { "Role" }
                        th scope="col" {}
                    }
                }
                tbody {
                    @for (membership, player) in &memberships {
                        tr {
                            td { (player.full_name()) }
                            td { (membership.role) }
                            td { (membership_actions(viewer.group_role, membership)) }
                        }
                    }
                }
            }
        };

        success(page_of_body(markup, user))
    })
    .instrument(span.0)
    .await
}

fn edit_group_form(
    group: &Group,
    courts: &[Court],
    form: Option<&EditGroupForm>,
    error: Option<&str>,
) -> Markup {
    let about = form.map(|f| f.about.as_str()).unwrap_or(group.about.as_str());
    let selected = form.map(|f| f.court.clone()).or_else(|| {
        courts
            .iter()
            .find(|court| court.id == group.court_id)
            .map(|court| court.public_id.clone())
    });
    html! {
        (page_title(format!("Edit {}", group.name)))
        (form_error(error))
        form method="post" action=(format!("/groups/{}/edit", group.public_id)) {
            div class="mb-3" {
                label for="court" class="form-label" { "Court" }
                (court_select(courts, selected.as_deref()))
            }
            div class="mb-3" {
                label for="about" class="form-label" { "About" }
                textarea class="form-control" id="about" name="about" rows="4" { (about) }
            }
            button type="submit" class="btn btn-primary" { "Save" }
        }
    }
}

fn only_organizer(user: User) -> StandardResponse {
    forbidden(error_403(
        Some("Only the organizer of this group may do that."),
        Some(user),
    ))
}

#[get("/groups/<group_id>/edit")]
pub async fn edit_group_page(
    group_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| -> StandardResponse {
        let Some(group) = Group::load_by_public_id(conn, &group_id)? else {
            return err_not_found(error_404(Some("No such group."), Some(user)));
        };
        if !has_permission(
            Some(&user),
            &Permission::ModifyGroup(GroupRef(group.id)),
            conn,
        )? {
            return only_organizer(user);
        }

        let courts = Court::load_all(conn)?;
        success(page_of_body(
            edit_group_form(&group, &courts, None, None),
            Some(user),
        ))
    })
    .instrument(span.0)
    .await
}

#[derive(FromForm, Serialize, Debug)]
pub struct EditGroupForm {
    pub court: String,
    pub about: String,
}

#[post("/groups/<group_id>/edit", data = "<form>")]
pub async fn do_edit_group(
    group_id: String,
    user: User,
    form: Form<EditGroupForm>,
    db: DbConn,
    cache: &State<PageCache>,
    span: TracingSpan,
) -> StandardResponse {
    let form = form.into_inner();
    let ret = db
        .run(move |conn| {
            conn.transaction(|conn| -> StandardResponse {
                let Some(group) = Group::load_by_public_id(conn, &group_id)?
                else {
                    return err_not_found(error_404(
                        Some("No such group."),
                        Some(user),
                    ));
                };
                if !has_permission(
                    Some(&user),
                    &Permission::ModifyGroup(GroupRef(group.id)),
                    conn,
                )? {
                    return only_organizer(user);
                }

                let courts = Court::load_all(conn)?;
                let invalid = |msg: &str| {
                    bad_request(page_of_body(
                        edit_group_form(&group, &courts, Some(&form), Some(msg)),
                        Some(user.clone()),
                    ))
                };
                if !Group::validate_about(&form.about) {
                    return invalid(
                        "Error: the description may be at most 600 characters long.",
                    );
                }
                let Some(court) =
                    courts.iter().find(|court| court.public_id == form.court)
                else {
                    return invalid("Error: please choose a court.");
                };

                diesel::update(groups::table.filter(groups::id.eq(group.id)))
                    .set((
                        groups::about.eq(&form.about),
                        groups::court_id.eq(court.id),
                    ))
                    .execute(conn)?;

                see_other_ok(Redirect::to(format!("/groups/{}", group.public_id)))
            })
        })
        .instrument(span.0)
        .await;

    if ret.is_ok() {
        cache.groups.invalidate();
    }
    ret
}

/// Deletes the group along with its memberships and events.
#[post("/groups/<group_id>/delete")]
pub async fn do_delete_group(
    group_id: String,
    user: User,
    db: DbConn,
    cache: &State<PageCache>,
    span: TracingSpan,
) -> StandardResponse {
    let ret = db
        .run(move |conn| {
            conn.transaction(|conn| -> StandardResponse {
                let Some(group) = Group::load_by_public_id(conn, &group_id)?
                else {
                    return err_not_found(error_404(
                        Some("No such group."),
                        Some(user),
                    ));
                };
                if !has_permission(
                    Some(&user),
                    &Permission::ModifyGroup(GroupRef(group.id)),
                    conn,
                )? {
                    return only_organizer(user);
                }

                diesel::delete(groups::table.filter(groups::id.eq(group.id)))
                    .execute(conn)?;
                tracing::info!("Deleted group {}", group.public_id);

                see_other_ok(Redirect::to("/groups"))
            })
        })
        .instrument(span.0)
        .await;

    if ret.is_ok() {
        cache.groups.invalidate();
    }
    ret
}

/// Requests membership. Does nothing if the player already has a membership
/// of any kind in the group.
#[post("/groups/<group_id>/join")]
pub async fn do_join_group(
    group_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            let Some(group) = Group::load_by_public_id(conn, &group_id)? else {
                return err_not_found(error_404(
                    Some("No such group."),
                    Some(user),
                ));
            };

            if Membership::of_user_in_group(conn, group.id, user.id)?.is_none()
            {
                insert_into(memberships::table)
                    .values((
                        memberships::public_id.eq(gen_uuid().to_string()),
                        memberships::group_id.eq(group.id),
                        memberships::user_id.eq(user.id),
                        memberships::role.eq(Role::Pending.as_str()),
                        memberships::created_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)?;
                tracing::info!("Player requested to join group {}", group.public_id);
            }

            see_other_ok(Redirect::to(format!("/groups/{}", group.public_id)))
        })
    })
    .instrument(span.0)
    .await
}

/// Leaves the group. The organizer cannot leave; anyone without a
/// membership is sent back to the group page with nothing changed.
#[post("/groups/<group_id>/quit")]
pub async fn do_quit_group(
    group_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            let Some(group) = Group::load_by_public_id(conn, &group_id)? else {
                return err_not_found(error_404(
                    Some("No such group."),
                    Some(user),
                ));
            };

            match Membership::of_user_in_group(conn, group.id, user.id)? {
                Some(membership) if membership.role.is_organizer() => {
                    return forbidden(error_403(
                        Some("The organizer cannot leave their own group."),
                        Some(user),
                    ));
                }
                Some(membership) => {
                    diesel::delete(
                        memberships::table
                            .filter(memberships::id.eq(membership.id)),
                    )
                    .execute(conn)?;
                    tracing::info!("Player left group {}", group.public_id);
                }
                None => (),
            }

            see_other_ok(Redirect::to(format!("/groups/{}", group.public_id)))
        })
    })
    .instrument(span.0)
    .await
}
