use db::{config::ConfigItem, group::role_in_group, role::Role, user::User};
use diesel::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct GroupRef(pub i64);

#[derive(Debug)]
/// A permission for a given resource on the system.
pub enum Permission {
    RegisterAsNewUser,
    /// Edit the site-wide configuration.
    ModifyGlobalConfig,
    /// Maintain reference data (courts) and expire past events.
    StaffAction,
    /// Edit or delete a group. Only its organizer may.
    ModifyGroup(GroupRef),
    /// Members, admins and the organizer may schedule events for a group.
    CreateEventInGroup(GroupRef),
}

/// Returns whether a requester has the requisite permission on the given
/// object.
#[tracing::instrument(skip(conn))]
pub fn has_permission(
    user: Option<&User>,
    permission: &Permission,
    conn: &mut SqliteConnection,
) -> QueryResult<bool> {
    let allowed = match permission {
        Permission::RegisterAsNewUser => !ConfigItem::signups_disabled(conn)?,
        Permission::ModifyGlobalConfig => {
            user.is_some_and(|user| user.is_superuser)
        }
        Permission::StaffAction => {
            user.is_some_and(|user| user.is_staff || user.is_superuser)
        }
        Permission::ModifyGroup(GroupRef(group_id)) => {
            group_role(user, conn, *group_id)?.is_some_and(Role::is_organizer)
        }
        Permission::CreateEventInGroup(GroupRef(group_id)) => {
            group_role(user, conn, *group_id)?.is_some_and(Role::is_member)
        }
    };

    if !allowed {
        tracing::info!("Permission denied");
    }

    Ok(allowed)
}

fn group_role(
    user: Option<&User>,
    conn: &mut SqliteConnection,
    group_id: i64,
) -> QueryResult<Option<Role>> {
    match user {
        Some(user) => role_in_group(conn, group_id, user.id),
        None => Ok(None),
    }
}
