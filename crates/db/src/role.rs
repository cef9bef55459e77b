//! Membership roles and the rules for moving a membership between them.
//!
//! Roles form a chain `pending < member < admin < organizer`. The organizer
//! is created together with the group and can never be changed, removed or
//! handed over; every other transition is gated on the role of the player
//! performing it.

use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
pub enum Role {
    Pending,
    Member,
    Admin,
    Organizer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Pending => "pending",
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Organizer => "organizer",
        }
    }

    /// Organizers, admins and members count as members of the group; pending
    /// join requests do not.
    pub fn is_member(self) -> bool {
        self >= Role::Member
    }

    pub fn is_admin(self) -> bool {
        self >= Role::Admin
    }

    pub fn is_organizer(self) -> bool {
        self == Role::Organizer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown membership role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Role::Pending),
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            "organizer" => Ok(Role::Organizer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Something a player may try to do to somebody's membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipAction {
    /// Approve a join request, or demote an admin.
    MakeMember,
    MakeAdmin,
    /// Hand over the group. There is no route which performs this; it exists
    /// so that the rules can reject it explicitly.
    MakeOrganizer,
    Remove,
}

impl MembershipAction {
    /// The role the membership ends up with, if it survives the action.
    pub fn resulting_role(self) -> Option<Role> {
        match self {
            MembershipAction::MakeMember => Some(Role::Member),
            MembershipAction::MakeAdmin => Some(Role::Admin),
            MembershipAction::MakeOrganizer => Some(Role::Organizer),
            MembershipAction::Remove => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum TransitionError {
    #[error("you are not a member of this group")]
    NotInGroup,
    #[error("the organizer's membership cannot be changed")]
    OrganizerIsFixed,
    #[error("the organizer of a group cannot be replaced")]
    OrganizerNotTransferable,
    #[error("only the organizer of this group may do that")]
    RequiresOrganizer,
    #[error("only an admin or the organizer of this group may do that")]
    RequiresAdmin,
}

/// Decides whether a player whose role in the group is `caller` may apply
/// `action` to a membership which currently has the role `target`.
///
/// `caller` is `None` when the player has no membership in the group at all.
pub fn check_transition(
    caller: Option<Role>,
    target: Role,
    action: MembershipAction,
) -> Result<(), TransitionError> {
    let caller = caller.ok_or(TransitionError::NotInGroup)?;

    if target.is_organizer() {
        return Err(TransitionError::OrganizerIsFixed);
    }

    let required = match (action, target) {
        (MembershipAction::MakeOrganizer, _) => {
            return Err(TransitionError::OrganizerNotTransferable)
        }
        (MembershipAction::MakeAdmin, _) => Role::Organizer,
        (MembershipAction::MakeMember, Role::Admin) => Role::Organizer,
        (MembershipAction::MakeMember, _) => Role::Admin,
        (MembershipAction::Remove, Role::Admin) => Role::Organizer,
        (MembershipAction::Remove, _) => Role::Admin,
    };

    if caller >= required {
        Ok(())
    } else if required == Role::Organizer {
        Err(TransitionError::RequiresOrganizer)
    } else {
        Err(TransitionError::RequiresAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::{check_transition, MembershipAction, Role, TransitionError};

    const ROLES: [Role; 4] =
        [Role::Pending, Role::Member, Role::Admin, Role::Organizer];

    #[test]
    fn roles_round_trip_through_their_names() {
        for role in ROLES {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn approving_a_join_request_needs_an_admin() {
        use MembershipAction::MakeMember;

        assert_eq!(
            check_transition(Some(Role::Member), Role::Pending, MakeMember),
            Err(TransitionError::RequiresAdmin)
        );
        assert_eq!(
            check_transition(Some(Role::Pending), Role::Pending, MakeMember),
            Err(TransitionError::RequiresAdmin)
        );
        assert!(
            check_transition(Some(Role::Admin), Role::Pending, MakeMember)
                .is_ok()
        );
        assert!(check_transition(
            Some(Role::Organizer),
            Role::Pending,
            MakeMember
        )
        .is_ok());
    }

    #[test]
    fn only_the_organizer_appoints_or_demotes_admins() {
        for target in [Role::Pending, Role::Member] {
            assert_eq!(
                check_transition(
                    Some(Role::Admin),
                    target,
                    MembershipAction::MakeAdmin
                ),
                Err(TransitionError::RequiresOrganizer)
            );
            assert!(check_transition(
                Some(Role::Organizer),
                target,
                MembershipAction::MakeAdmin
            )
            .is_ok());
        }

        assert_eq!(
            check_transition(
                Some(Role::Admin),
                Role::Admin,
                MembershipAction::MakeMember
            ),
            Err(TransitionError::RequiresOrganizer)
        );
        assert!(check_transition(
            Some(Role::Organizer),
            Role::Admin,
            MembershipAction::MakeMember
        )
        .is_ok());
    }

    #[test]
    fn removal_rules() {
        use MembershipAction::Remove;

        assert!(check_transition(Some(Role::Admin), Role::Pending, Remove)
            .is_ok());
        assert!(
            check_transition(Some(Role::Admin), Role::Member, Remove).is_ok()
        );
        assert_eq!(
            check_transition(Some(Role::Member), Role::Member, Remove),
            Err(TransitionError::RequiresAdmin)
        );
        assert_eq!(
            check_transition(Some(Role::Admin), Role::Admin, Remove),
            Err(TransitionError::RequiresOrganizer)
        );
        assert!(
            check_transition(Some(Role::Organizer), Role::Admin, Remove)
                .is_ok()
        );
    }

    #[test]
    fn nobody_touches_the_organizer() {
        for caller in ROLES {
            for action in [
                MembershipAction::MakeMember,
                MembershipAction::MakeAdmin,
                MembershipAction::MakeOrganizer,
                MembershipAction::Remove,
            ] {
                assert_eq!(
                    check_transition(Some(caller), Role::Organizer, action),
                    Err(TransitionError::OrganizerIsFixed)
                );
            }
        }
    }

    #[test]
    fn promotion_to_organizer_is_never_allowed() {
        for caller in ROLES {
            for target in [Role::Pending, Role::Member, Role::Admin] {
                assert!(check_transition(
                    Some(caller),
                    target,
                    MembershipAction::MakeOrganizer
                )
                .is_err());
            }
        }
    }

    #[test]
    fn outsiders_cannot_do_anything() {
        assert_eq!(
            check_transition(None, Role::Pending, MembershipAction::Remove),
            Err(TransitionError::NotInGroup)
        );
    }

    /// A transition succeeds exactly when the caller ranks at or above the
    /// role the table requires.
    #[test]
    fn success_is_monotonic_in_the_callers_role() {
        for target in [Role::Pending, Role::Member, Role::Admin] {
            for action in [
                MembershipAction::MakeMember,
                MembershipAction::MakeAdmin,
                MembershipAction::Remove,
            ] {
                let mut allowed_before = false;
                for caller in ROLES {
                    let allowed =
                        check_transition(Some(caller), target, action).is_ok();
                    assert!(!allowed_before || allowed);
                    allowed_before = allowed;
                }
                assert!(allowed_before, "organizer may always {action:?}");
            }
        }
    }
}
