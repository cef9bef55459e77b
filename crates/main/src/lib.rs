use std::time::Duration;

use admin::{
    admin_overview,
    config::{config_page, do_upsert_config, edit_existing_config_item_page},
    expire::do_expire_events,
    setup::{do_setup, setup_page},
};
use auth::{
    change_password::{change_password_form, do_change_password},
    login::{do_login, login_page},
    logout::{do_logout, logout},
    password_reset::{
        do_request_password_reset, do_reset_with_code, password_reset_page,
        reset_with_code_page,
    },
    register::{do_register, register_page},
    settings::{do_update_settings, settings_page},
};
use cache::PageCache;
use config::AppConfig;
use courts::{
    create_court_page, do_create_court, do_delete_court, do_edit_court,
    edit_court_page, list_courts, view_court,
};
use db::DbConn;
use diesel_migrations::{
    embed_migrations, EmbeddedMigrations, MigrationHarness,
};
use events::{
    create_event_page, create_group_event_page, do_create_event,
    do_create_group_event, do_delete_event, do_edit_event, do_quit_event,
    do_signup, edit_event_form, list_events, view_event,
};
use groups::{
    create_group_page, do_create_group, do_delete_group, do_edit_group,
    do_join_group, do_quit_group, edit_group_page, list_groups, view_group,
};
use home_page::index;
use maud::Markup;
use memberships::{do_make_admin, do_make_member, do_remove_membership};
use rocket::{
    fairing::AdHoc,
    figment::{
        util::map,
        value::{Map, Value},
    },
    response::Redirect,
    Build, Rocket,
};
use trace_request::RequestIdFairing;

pub mod admin;
pub mod auth;
pub mod cache;
pub mod config;
pub mod courts;
pub mod events;
pub mod groups;
pub mod home_page;
pub mod memberships;
pub mod permissions;
pub mod util;
pub mod util_resp;

#[cfg(test)]
mod tests;

#[macro_use]
extern crate rocket;

pub const MIGRATIONS: EmbeddedMigrations =
    embed_migrations!("../../migrations");

/// Pages which need a logged in player send everybody else to the login
/// form.
#[catch(401)]
fn unauthorized() -> Redirect {
    Redirect::to("/login")
}

#[catch(404)]
fn not_found() -> Markup {
    ui::error_404(None::<&str>, None)
}

pub fn make_rocket(default_db: &str) -> Rocket<Build> {
    let db: Map<_, Value> = map![
        "url" => std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| default_db.to_string())
            .into(),
        "pool_size" => 10.into(),
        "timeout" => 5.into(),
    ];

    let figment =
        rocket::Config::figment().merge(("databases", map!["database" => db]));

    let figment = if let Ok(secret) = std::env::var("SECRET_KEY") {
        figment.merge(("secret_key", secret))
    } else if cfg!(test) {
        figment.merge(("secret_key", "0".repeat(64)))
    } else {
        figment
    };

    let app_config = figment.extract::<AppConfig>().unwrap_or_else(|e| {
        tracing::warn!("Could not read application settings, using defaults: {e}");
        AppConfig::default()
    });
    let page_cache =
        PageCache::new(Duration::from_secs(app_config.page_cache_ttl_secs));

    rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(AdHoc::try_on_ignite("migrations", |rocket| async move {
            let Some(db_conn) = DbConn::get_one(&rocket).await else {
                tracing::error!("No database connection available for migrations");
                return Err(rocket);
            };

            let ret: Result<(), Box<dyn std::error::Error + Send + Sync>> =
                db_conn
                    .run(move |conn| {
                        conn.run_pending_migrations(MIGRATIONS)?;
                        Ok(())
                    })
                    .await;

            match ret {
                Ok(_) => Ok(rocket),
                Err(e) => {
                    tracing::error!("Failed to run migrations: {e}");
                    Err(rocket)
                }
            }
        }))
        .attach(RequestIdFairing)
        .manage(app_config)
        .manage(page_cache)
        .register("/", catchers![unauthorized, not_found])
        .mount(
            "/",
            routes![
                index,
                // courts
                list_courts,
                create_court_page,
                do_create_court,
                view_court,
                edit_court_page,
                do_edit_court,
                do_delete_court,
                // groups
                list_groups,
                create_group_page,
                do_create_group,
                view_group,
                edit_group_page,
                do_edit_group,
                do_delete_group,
                do_join_group,
                do_quit_group,
                create_group_event_page,
                do_create_group_event,
                do_make_member,
                do_make_admin,
                do_remove_membership,
                // events
                list_events,
                create_event_page,
                do_create_event,
                view_event,
                edit_event_form,
                do_edit_event,
                do_delete_event,
                do_signup,
                do_quit_event,
                // accounts
                register_page,
                do_register,
                login_page,
                do_login,
                logout,
                do_logout,
                settings_page,
                do_update_settings,
                change_password_form,
                do_change_password,
                password_reset_page,
                do_request_password_reset,
                reset_with_code_page,
                do_reset_with_code,
                // administration
                admin_overview,
                setup_page,
                do_setup,
                config_page,
                edit_existing_config_item_page,
                do_upsert_config,
                do_expire_events
            ],
        )
}
