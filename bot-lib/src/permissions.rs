use poise::serenity_prelude::{Member, RoleId, UserId};
use serde::Deserialize;
use std::collections::BTreeMap;

/// What a permission check gets to see of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberContext {
    pub user_id: UserId,
    pub roles: Vec<RoleId>,
}

impl MemberContext {
    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.roles.contains(&role_id)
    }
}

impl From<&Member> for MemberContext {
    fn from(member: &Member) -> Self {
        Self {
            user_id: member.user.id,
            roles: member.roles.clone(),
        }
    }
}

/// Decides whether a member holds a permission key like `p.dvi.roles.sudo`.
pub trait AuthorizationPolicy {
    fn evaluate(&self, permission: &str, member: &MemberContext) -> bool;
}

/// One entry of the `[permissions]` config table.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionRule {
    #[serde(default)]
    pub allow_roles: Vec<u64>,
    #[serde(default)]
    pub deny_roles: Vec<u64>,
    #[serde(default)]
    pub allow_users: Vec<u64>,
    #[serde(default)]
    pub deny_users: Vec<u64>,
}

pub type PermissionRules = BTreeMap<String, PermissionRule>;

/// Config backed policy.
///
/// Resolution order: explicit user denial, explicit user grant, denied role,
/// allowed role, and finally `default` when nothing matched (or the key is
/// unknown altogether).
pub struct PermissionTable<'a> {
    rules: &'a PermissionRules,
    default: bool,
}

impl<'a> PermissionTable<'a> {
    pub fn new(rules: &'a PermissionRules, default: bool) -> Self {
        Self { rules, default }
    }
}

impl AuthorizationPolicy for PermissionTable<'_> {
    fn evaluate(&self, permission: &str, member: &MemberContext) -> bool {
        let Some(rule) = self.rules.get(permission) else {
            return self.default;
        };

        let user_id = member.user_id.get();
        let holds_any =
            |roles: &[u64]| member.roles.iter().any(|role| roles.contains(&role.get()));

        if rule.deny_users.contains(&user_id) {
            false
        } else if rule.allow_users.contains(&user_id) {
            true
        } else if holds_any(&rule.deny_roles) {
            false
        } else if holds_any(&rule.allow_roles) {
            true
        } else {
            self.default
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TENURED: u64 = 943653875368480808;
    const RECRUIT: u64 = 944096516593831947;

    fn member(user: u64, roles: &[u64]) -> MemberContext {
        MemberContext {
            user_id: UserId::new(user),
            roles: roles.iter().copied().map(RoleId::new).collect(),
        }
    }

    fn rules() -> PermissionRules {
        toml::from_str(
            r#"
["p.dvi.roles.sudo"]
allow_roles = [943653875368480808]
deny_users = [42]

["p.dvi.roles.qrf"]
allow_users = [7]
deny_roles = [944096516593831947]
"#,
        )
        .unwrap()
    }

    #[test]
    fn allowed_role_grants() {
        let rules = rules();
        let table = PermissionTable::new(&rules, false);

        assert!(table.evaluate("p.dvi.roles.sudo", &member(1, &[TENURED])));
        assert!(!table.evaluate("p.dvi.roles.sudo", &member(1, &[RECRUIT])));
    }

    #[test]
    fn user_denial_beats_roles() {
        let rules = rules();
        let table = PermissionTable::new(&rules, true);

        assert!(!table.evaluate("p.dvi.roles.sudo", &member(42, &[TENURED])));
    }

    #[test]
    fn user_grant_beats_denied_role() {
        let rules = rules();
        let table = PermissionTable::new(&rules, false);

        assert!(table.evaluate("p.dvi.roles.qrf", &member(7, &[RECRUIT])));
        assert!(!table.evaluate("p.dvi.roles.qrf", &member(8, &[RECRUIT])));
    }

    #[test]
    fn unknown_keys_fall_back_to_default() {
        let rules = rules();
        let nobody = member(1, &[]);

        assert!(!PermissionTable::new(&rules, false).evaluate("p.dvi.vc.rename", &nobody));
        assert!(PermissionTable::new(&rules, true).evaluate("p.dvi.vc.rename", &nobody));
    }
}
