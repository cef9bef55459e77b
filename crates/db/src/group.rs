use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::{
    role::Role,
    schema::{groups, memberships, users},
    user::User,
};

#[derive(Debug, Queryable, Serialize, Clone, Hash, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub organizer_id: i64,
    pub court_id: i64,
    pub about: String,
    pub created_at: NaiveDateTime,
}

impl Group {
    pub fn validate_name(name: &str) -> bool {
        let n = name.trim().chars().count();
        n > 0 && n <= 50
    }

    pub fn validate_about(about: &str) -> bool {
        about.chars().count() <= 600
    }

    pub fn load_by_public_id(
        conn: &mut SqliteConnection,
        public_id: &str,
    ) -> QueryResult<Option<Group>> {
        groups::table
            .filter(groups::public_id.eq(public_id))
            .first::<Group>(conn)
            .optional()
    }

    pub fn load_all(conn: &mut SqliteConnection) -> QueryResult<Vec<Group>> {
        groups::table.order_by(groups::name.asc()).load::<Group>(conn)
    }

    /// Every membership of the group together with the player it belongs to,
    /// highest role first.
    pub fn memberships_with_players(
        &self,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Vec<(Membership, User)>> {
        let mut rows = memberships::table
            .filter(memberships::group_id.eq(self.id))
            .inner_join(users::table)
            .order_by(memberships::created_at.asc())
            .load::<(Membership, User)>(conn)?;
        rows.sort_by_key(|(membership, _)| std::cmp::Reverse(membership.role));
        Ok(rows)
    }
}

#[cfg(test)]
#[test]
fn test_group_validate() {
    assert!(Group::validate_name("Tuesday Night Volleyball"));
    assert!(!Group::validate_name(""));
    assert!(!Group::validate_name(&"v".repeat(51)));
}

/// A player's standing within a group.
#[derive(Debug, Queryable, Serialize, Clone, PartialEq, Eq)]
pub struct Membership {
    pub id: i64,
    pub public_id: String,
    pub group_id: i64,
    pub user_id: i64,
    #[diesel(deserialize_as = String)]
    pub role: Role,
    pub created_at: NaiveDateTime,
}

impl Membership {
    pub fn load_by_public_id(
        conn: &mut SqliteConnection,
        public_id: &str,
    ) -> QueryResult<Option<Membership>> {
        memberships::table
            .filter(memberships::public_id.eq(public_id))
            .first::<Membership>(conn)
            .optional()
    }

    pub fn of_user_in_group(
        conn: &mut SqliteConnection,
        group_id: i64,
        user_id: i64,
    ) -> QueryResult<Option<Membership>> {
        memberships::table
            .filter(memberships::group_id.eq(group_id))
            .filter(memberships::user_id.eq(user_id))
            .first::<Membership>(conn)
            .optional()
    }
}

/// The role `user_id` holds in `group_id`, if any.
#[tracing::instrument(skip(conn))]
pub fn role_in_group(
    conn: &mut SqliteConnection,
    group_id: i64,
    user_id: i64,
) -> QueryResult<Option<Role>> {
    Ok(Membership::of_user_in_group(conn, group_id, user_id)?
        .map(|membership| membership.role))
}
