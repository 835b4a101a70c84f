use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::MemberRole;

/// Display role derived from the admin flag and organisation memberships.
/// Everyone is a participant; precedence is Admin > Club owner > Participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountTypes {
    pub is_platform_admin: bool,
    pub is_club_owner: bool,
    pub is_participant: bool,
    pub label: &'static str,
}

pub fn classify(is_platform_admin: bool, membership_roles: &[MemberRole]) -> AccountTypes {
    let is_club_owner = membership_roles
        .iter()
        .any(|r| matches!(r, MemberRole::Owner | MemberRole::Admin));

    let label = if is_platform_admin {
        "Admin"
    } else if is_club_owner {
        "Club owner"
    } else {
        "Participant"
    };

    AccountTypes {
        is_platform_admin,
        is_club_owner,
        is_participant: true,
        label,
    }
}

/// Load the classifier inputs for an account and classify. Pure read.
pub async fn account_types(db: &PgPool, account_id: Uuid) -> AppResult<AccountTypes> {
    let is_platform_admin: bool =
        sqlx::query_scalar("SELECT is_platform_admin FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(db)
            .await?
            .unwrap_or(false);

    let roles: Vec<String> =
        sqlx::query_scalar("SELECT role FROM organisation_members WHERE account_id = $1")
            .bind(account_id)
            .fetch_all(db)
            .await?;

    let roles: Vec<MemberRole> = roles.iter().filter_map(|r| MemberRole::parse(r)).collect();
    Ok(classify(is_platform_admin, &roles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_wins_over_club_owner() {
        let t = classify(true, &[MemberRole::Owner]);
        assert_eq!(t.label, "Admin");
        assert!(t.is_club_owner);
        assert!(t.is_participant);
    }

    #[test]
    fn owner_or_admin_membership_makes_club_owner() {
        assert_eq!(classify(false, &[MemberRole::Owner]).label, "Club owner");
        assert_eq!(classify(false, &[MemberRole::Admin]).label, "Club owner");
        assert_eq!(
            classify(false, &[MemberRole::Member, MemberRole::Admin]).label,
            "Club owner"
        );
    }

    #[test]
    fn plain_member_is_participant() {
        let t = classify(false, &[MemberRole::Member]);
        assert_eq!(t.label, "Participant");
        assert!(!t.is_club_owner);
    }

    #[test]
    fn no_memberships_is_participant() {
        assert_eq!(classify(false, &[]).label, "Participant");
    }
}
