use db::config::ConfigItem;
use db::{schema::config, user::User, DbConn};
use diesel::prelude::*;
use maud::Markup;
use rocket::form::{Form, FromForm};
use rocket::response::Redirect;
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{error_403, error_404, page_of_body, page_title};

use crate::{
    permissions::{has_permission, Permission},
    util::gen_uuid,
    util_resp::{err_not_found, forbidden, see_other_ok, success, StandardResponse},
};

fn not_authorized(user: User) -> StandardResponse {
    forbidden(error_403(
        Some("Error: you are not authorized to view this page!"),
        Some(user),
    ))
}

fn config_table(config_items: &[ConfigItem]) -> Markup {
    maud::html! {
        table class="table" {
            thead {
                tr {
                    th scope="col" { "Key" }
                    th scope="col" { "Value" }
                    th scope="col" { "Edit" }
                }
            }
            tbody {
                @for config in config_items {
                    tr {
                        td { (config.key) }
                        td { (config.value) }
                        td {
                            a href=(format!("/admin/config/{}/edit", config.public_id)) {
                                "Edit"
                            }
                        }
                    }
                }
            }
        }
    }
}

#[get("/admin/config")]
pub async fn config_page(
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    db.run(|conn| -> StandardResponse {
        if !has_permission(Some(&user), &Permission::ModifyGlobalConfig, conn)?
        {
            return not_authorized(user);
        }

        let config_items = config::table
            .order_by(config::key.asc())
            .load::<ConfigItem>(conn)?;

        let create_form_markup = maud::html! {
            form action="/admin/config/upsert" method="post" {
                div class="mb-3" {
                    label for="key" class="form-label" { "Key" }
                    input type="text" class="form-control" id="key" name="key" placeholder="disable_signups";
                }
                div class="mb-3" {
                    label for="value" class="form-label" { "Value" }
                    input type="text" class="form-control" id="value" name="value" placeholder="1";
                }
                button type="submit" class="btn btn-primary" { "Add Item" }
            }
        };

        success(page_of_body(
            maud::html! {
                (page_title("Site configuration"))
                h2 { "Current config items" }
                (config_table(&config_items))
                h2 { "Add new config item" }
                (create_form_markup)
            },
            Some(user),
        ))
    })
    .instrument(span.0)
    .await
}

#[get("/admin/config/<config_id>/edit")]
pub async fn edit_existing_config_item_page(
    db: DbConn,
    user: User,
    config_id: String,
    span: TracingSpan,
) -> StandardResponse {
    db.run(move |conn| -> StandardResponse {
        if !has_permission(Some(&user), &Permission::ModifyGlobalConfig, conn)?
        {
            return not_authorized(user);
        }

        let config_item = config::table
            .filter(config::public_id.eq(&config_id))
            .first::<ConfigItem>(conn)
            .optional()?;
        let Some(config_item) = config_item else {
            return err_not_found(error_404(
                Some("No such config item."),
                Some(user),
            ));
        };

        success(page_of_body(
            maud::html! {
                (page_title("Edit config item"))
                form action="/admin/config/upsert" method="post" {
                    div class="mb-3" {
                        label for="key" class="form-label" { "Key" }
                        input type="text" class="form-control" id="key" name="key" value=(config_item.key) readonly="readonly";
                    }
                    div class="mb-3" {
                        label for="value" class="form-label" { "Value" }
                        input type="text" class="form-control" id="value" name="value" value=(config_item.value);
                    }
                    button type="submit" class="btn btn-primary" { "Save changes" }
                }
            },
            Some(user),
        ))
    })
    .instrument(span.0)
    .await
}

#[derive(FromForm, Serialize, Debug)]
pub struct UpsertConfigForm {
    pub key: String,
    pub value: String,
}

#[post("/admin/config/upsert", data = "<form>")]
pub async fn do_upsert_config(
    db: DbConn,
    user: User,
    form: Form<UpsertConfigForm>,
    span: TracingSpan,
) -> StandardResponse {
    let form = form.into_inner();
    db.run(move |conn| {
        conn.transaction(|conn| -> StandardResponse {
            if !has_permission(
                Some(&user),
                &Permission::ModifyGlobalConfig,
                conn,
            )? {
                return not_authorized(user);
            }

            diesel::insert_into(config::table)
                .values((
                    config::public_id.eq(gen_uuid().to_string()),
                    config::key.eq(form.key.trim()),
                    config::value.eq(&form.value),
                ))
                .on_conflict(config::key)
                .do_update()
                .set(config::value.eq(&form.value))
                .execute(conn)?;

            tracing::info!("Set config item {}", form.key.trim());

            see_other_ok(Redirect::to("/admin/config"))
        })
    })
    .instrument(span.0)
    .await
}
