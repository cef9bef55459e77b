use chrono::Utc;
use db::{
    court::Court,
    event::Event,
    group::{Group, Membership},
    role::Role,
    schema::{courts, events, groups, memberships, participations},
    user::User,
    DbConn,
};
use diesel::prelude::*;
use maud::{html, Markup};
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::page_of_body;

use crate::{
    events::event_table,
    util_resp::{success, StandardResponse},
};

/// What a logged-in player sees on the front page.
pub struct Dashboard {
    /// Unexpired events the player started or signed up for.
    pub my_events: Vec<(Event, Court)>,
    /// Groups the player has been accepted into, with their role.
    pub my_groups: Vec<(Membership, Group)>,
    /// Unexpired events of those groups.
    pub group_events: Vec<(Event, Court)>,
}

impl Dashboard {
    pub fn load(conn: &mut SqliteConnection, user: &User) -> QueryResult<Self> {
        let today = Utc::now().date_naive();

        let my_events = events::table
            .inner_join(courts::table)
            .filter(events::is_expired.eq(false))
            .filter(events::play_date.ge(today))
            .filter(
                events::initiator_id.eq(user.id).or(events::id.eq_any(
                    participations::table
                        .filter(participations::user_id.eq(user.id))
                        .select(participations::event_id),
                )),
            )
            .order_by((events::play_date.asc(), events::play_start_time.asc()))
            .load::<(Event, Court)>(conn)?;

        let my_groups = memberships::table
            .inner_join(groups::table)
            .filter(memberships::user_id.eq(user.id))
            .filter(memberships::role.ne(Role::Pending.as_str()))
            .order_by(groups::name.asc())
            .load::<(Membership, Group)>(conn)?;

        let group_ids = my_groups
            .iter()
            .map(|(_, group)| group.id)
            .collect::<Vec<_>>();
        let group_events = events::table
            .inner_join(courts::table)
            .filter(events::is_expired.eq(false))
            .filter(events::play_date.ge(today))
            .filter(events::group_id.eq_any(group_ids))
            .order_by((events::play_date.asc(), events::play_start_time.asc()))
            .load::<(Event, Court)>(conn)?;

        Ok(Self {
            my_events,
            my_groups,
            group_events,
        })
    }
}

fn welcome() -> Markup {
    html! {
        div.container {
            div.row.justify-content-center.my-5 {
                div.col-md-8.text-center {
                    h1.display-4 { "PlayOne" }
                    p.lead { "Find a volleyball group, join a game, or organize your own." }
                    div.mt-4 {
                        a.btn.btn-primary.m-1 href="/events" { "Browse events" }
                        a.btn.btn-outline-primary.m-1 href="/groups" { "Browse groups" }
                        a.btn.btn-outline-secondary.m-1 href="/register" { "Register" }
                    }
                }
            }
        }
    }
}

#[get("/")]
pub async fn index(
    user: Option<User>,
    db: DbConn,
    span: TracingSpan,
) -> StandardResponse {
    let Some(user) = user else {
        return success(page_of_body(welcome(), None));
    };

    let user2 = user.clone();
    let dashboard = db
        .run(move |conn| Dashboard::load(conn, &user2))
        .instrument(span.0)
        .await?;

    success(page_of_body(
        html! {
            div.container {
                h1.my-3 { "Hello, " (user.short_name()) }
                h2 { "My events" }
                (event_table(&dashboard.my_events))
                h2 { "My groups" }
                @if dashboard.my_groups.is_empty() {
                    p.text-muted {
                        "You have not joined any groups yet. "
                        a href="/groups" { "Find one" }
                        "."
                    }
                } @else {
                    ul.list-group.mb-3 {
                        @for (membership, group) in &dashboard.my_groups {
                            li.list-group-item {
                                a href=(format!("/groups/{}", group.public_id)) { (group.name) }
                                " "
                                span.badge.text-bg-secondary { (membership.role) }
                            }
                        }
                    }
                }
                h2 { "Events in my groups" }
                (event_table(&dashboard.group_events))
            }
        },
        Some(user),
    ))
}
