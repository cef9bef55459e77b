use chrono::Utc;
use db::{
    court::Court,
    event::Event,
    group::Group,
    schema::{courts, events, groups},
    user::User,
    DbConn,
};
use diesel::{
    dsl::{exists, select},
    prelude::*,
};
use maud::{html, Markup};
use rocket::{form::Form, response::Redirect, State};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{action_button, error_403, error_404, form_error, page_of_body, page_title};

use crate::{
    cache::PageCache,
    permissions::{has_permission, Permission},
    util::gen_uuid,
    util_resp::{
        bad_request, err_not_found, forbidden, see_other_ok, success,
        StandardResponse,
    },
};

#[get("/courts")]
pub async fn list_courts(
    user: Option<User>,
    db: DbConn,
    cache: &State<PageCache>,
    span: TracingSpan,
) -> StandardResponse {
    let courts = match cache.courts.get() {
        Some(courts) => courts,
        None => {
            let courts =
                db.run(|conn| Court::load_all(conn)).instrument(span.0).await?;
            cache.courts.put(courts.clone());
            courts
        }
    };

    success(page_of_body(
        html! {
            (page_title("Courts"))
            @if user.is_some() {
                a class="btn btn-primary mb-3" href="/courts/new" { "Add a court" }
            }
            @if courts.is_empty() {
                p { "No courts have been added yet." }
            } @else {
                ul class="list-group" {
                    @for court in &courts {
                        li class="list-group-item" {
                            a href=(format!("/courts/{}", court.public_id)) { (court.name) }
                        }
                    }
                }
            }
        },
        user,
    ))
}

fn court_form(
    action: &str,
    form: Option<&CourtForm>,
    error: Option<&str>,
) -> Markup {
    let name = form.map(|f| f.name.as_str()).unwrap_or_default();
    let photo = form.map(|f| f.photo.as_str()).unwrap_or_default();
    html! {
        (form_error(error))
        form method="post" action=(action) {
            div class="mb-3" {
                label for="name" class="form-label" { "Name" }
                input type="text" class="form-control" id="name" name="name" value=(name) required;
            }
            div class="mb-3" {
                label for="photo" class="form-label" { "Photo URL (optional)" }
                input type="url" class="form-control" id="photo" name="photo" value=(photo);
            }
            button type="submit" class="btn btn-primary" { "Save" }
        }
    }
}

#[get("/courts/new")]
pub async fn create_court_page(user: User) -> StandardResponse {
    success(page_of_body(
        html! {
            (page_title("Add a court"))
            (court_form("/courts/new", None, None))
        },
        Some(user),
    ))
}

#[derive(FromForm, Serialize, Debug)]
pub struct CourtForm {
    pub name: String,
    pub photo: String,
}

impl CourtForm {
    /// Checks the form, returning the photo to store.
    fn validate(&self) -> Result<Option<String>, &'static str> {
        if !Court::validate_name(&self.name) {
            return Err("Error: court names must be between 1 and 80 characters long.");
        }
        let photo = self.photo.trim();
        if photo.is_empty() {
            return Ok(None);
        }
        if !Court::validate_photo(photo) {
            return Err("Error: the photo must be a link starting with http:// or https://.");
        }
        Ok(Some(photo.to_string()))
    }
}

#[post("/courts/new", data = "<form>")]
pub async fn do_create_court(
    user: User,
    form: Form<CourtForm>,
    db: DbConn,
    cache: &State<PageCache>,
    span: TracingSpan,
) -> StandardResponse {
    let form = form.into_inner();
    let ret = db
        .run(move |conn| {
            conn.transaction(|conn| -> StandardResponse {
                let invalid = |msg: &str| {
                    bad_request(page_of_body(
                        html! {
                            (page_title("Add a court"))
                            (court_form("/courts/new", Some(&form), Some(msg)))
                        },
                        Some(user.clone()),
                    ))
                };

                let photo = match form.validate() {
                    Ok(photo) => photo,
                    Err(msg) => return invalid(msg),
                };

                let name = form.name.trim();
                let name_taken = select(exists(
                    courts::table.filter(courts::name.eq(name)),
                ))
                .get_result::<bool>(conn)?;
                if name_taken {
                    return invalid("Error: a court with that name already exists.");
                }

                let public_id = gen_uuid().to_string();
                diesel::insert_into(courts::table)
                    .values((
                        courts::public_id.eq(&public_id),
                        courts::name.eq(name),
                        courts::photo.eq(photo),
                        courts::created_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)?;

                tracing::info!("Created court {public_id}");

                see_other_ok(Redirect::to(format!("/courts/{public_id}")))
            })
        })
        .instrument(span.0)
        .await;

    if ret.is_ok() {
        cache.courts.invalidate();
    }
    ret
}

#[get("/courts/<court_id>")]
pub async fn view_court(
    court_id: String,
    user: Option<User>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| -> StandardResponse {
        let Some(court) = Court::load_by_public_id(conn, &court_id)? else {
            return err_not_found(error_404(Some("No such court."), user));
        };

        let groups_here = groups::table
            .filter(groups::court_id.eq(court.id))
            .order_by(groups::name.asc())
            .load::<Group>(conn)?;

        let today = Utc::now().date_naive();
        let upcoming_public_events = events::table
            .inner_join(courts::table)
            .filter(events::court_id.eq(court.id))
            .filter(events::is_public.eq(true))
            .filter(events::is_expired.eq(false))
            .filter(events::play_date.ge(today))
            .order_by((events::play_date.asc(), events::play_start_time.asc()))
            .load::<(Event, Court)>(conn)?;

        let is_staff = has_permission(user.as_ref(), &Permission::StaffAction, conn)?;

        success(page_of_body(
            html! {
                (page_title(&court.name))
                @if let Some(photo) = &court.photo {
                    img src=(photo) class="img-fluid mb-3" alt=(court.name);
                }
                @if is_staff {
                    div class="mb-3" {
                        a class="btn btn-sm btn-secondary m-1" href=(format!("/courts/{}/edit", court.public_id)) { "Edit" }
                        (action_button(&format!("/courts/{}/delete", court.public_id), "Delete", "btn-danger"))
                    }
                }
                h3 { "Groups playing here" }
                ul class="list-group mb-3" {
                    @for group in &groups_here {
                        li class="list-group-item" {
                            a href=(format!("/groups/{}", group.public_id)) { (group.name) }
                        }
                    }
                }
                h3 { "Upcoming events" }
                (crate::events::event_table(&upcoming_public_events))
            },
            user,
        ))
    })
    .instrument(span.0)
    .await
}

#[get("/courts/<court_id>/edit")]
pub async fn edit_court_page(
    court_id: String,
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| -> StandardResponse {
        let Some(court) = Court::load_by_public_id(conn, &court_id)? else {
            return err_not_found(error_404(Some("No such court."), Some(user)));
        };
        if !has_permission(Some(&user), &Permission::StaffAction, conn)? {
            return forbidden(error_403(
                Some("Only staff may edit courts."),
                Some(user),
            ));
        }

        let action = format!("/courts/{}/edit", court.public_id);
        let form = CourtForm {
            name: court.name.clone(),
            photo: court.photo.clone().unwrap_or_default(),
        };
        success(page_of_body(
            html! {
                (page_title(format!("Edit {}", court.name)))
                (court_form(&action, Some(&form), None))
            },
            Some(user),
        ))
    })
    .instrument(span.0)
    .await
}

#[post("/courts/<court_id>/edit", data = "<form>")]
pub async fn do_edit_court(
    court_id: String,
    user: User,
    form: Form<CourtForm>,
    db: DbConn,
    cache: &State<PageCache>,
    span: TracingSpan,
) -> StandardResponse {
    let form = form.into_inner();
    let ret = db
        .run(move |conn| {
            conn.transaction(|conn| -> StandardResponse {
                let Some(court) = Court::load_by_public_id(conn, &court_id)?
                else {
                    return err_not_found(error_404(
                        Some("No such court."),
                        Some(user),
                    ));
                };
                if !has_permission(Some(&user), &Permission::StaffAction, conn)? {
                    return forbidden(error_403(
                        Some("Only staff may edit courts."),
                        Some(user),
                    ));
                }

                let action = format!("/courts/{}/edit", court.public_id);
                let invalid = |msg: &str| {
                    bad_request(page_of_body(
                        html! {
                            (page_title(format!("Edit {}", court.name)))
                            (court_form(&action, Some(&form), Some(msg)))
                        },
                        Some(user.clone()),
                    ))
                };

                let photo = match form.validate() {
                    Ok(photo) => photo,
                    Err(msg) => return invalid(msg),
                };

                let name = form.name.trim();
                let name_taken = select(exists(
                    courts::table
                        .filter(courts::name.eq(name))
                        .filter(courts::id.ne(court.id)),
                ))
                .get_result::<bool>(conn)?;
                if name_taken {
                    return invalid("Error: a court with that name already exists.");
                }

                diesel::update(courts::table.filter(courts::id.eq(court.id)))
                    .set((courts::name.eq(name), courts::photo.eq(photo)))
                    .execute(conn)?;

                see_other_ok(Redirect::to(format!("/courts/{}", court.public_id)))
            })
        })
        .instrument(span.0)
        .await;

    if ret.is_ok() {
        cache.courts.invalidate();
    }
    ret
}

/// Deleting a court also deletes the groups and events which use it.
#[post("/courts/<court_id>/delete")]
pub async fn do_delete_court(
    court_id: String,
    user: User,
    db: DbConn,
    cache: &State<PageCache>,
    span: TracingSpan,
) -> StandardResponse {
    let ret = db
        .run(move |conn| {
            conn.transaction(|conn| -> StandardResponse {
                let Some(court) = Court::load_by_public_id(conn, &court_id)?
                else {
                    return err_not_found(error_404(
                        Some("No such court."),
                        Some(user),
                    ));
                };
                if !has_permission(Some(&user), &Permission::StaffAction, conn)? {
                    return forbidden(error_403(
                        Some("Only staff may delete courts."),
                        Some(user),
                    ));
                }

                diesel::delete(courts::table.filter(courts::id.eq(court.id)))
                    .execute(conn)?;
                tracing::info!("Deleted court {}", court.public_id);

                see_other_ok(Redirect::to("/courts"))
            })
        })
        .instrument(span.0)
        .await;

    if ret.is_ok() {
        // groups at the court went with it
        cache.courts.invalidate();
        cache.groups.invalidate();
    }
    ret
}

/// A `<select name="court">` whose values are court public ids.
pub fn court_select(courts: &[Court], selected: Option<&str>) -> Markup {
    html! {
        select class="form-select" id="court" name="court" required {
            @for court in courts {
                option value=(court.public_id) selected[selected == Some(court.public_id.as_str())] {
                    (court.name)
                }
            }
        }
    }
}
