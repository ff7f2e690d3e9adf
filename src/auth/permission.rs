//! Permission checking for Teahouse.
//!
//! Capabilities are fixed boolean flags. `master` implies every capability,
//! and can never be changed through [`check_elevated`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Permissions, PermissionsUpdate, Session};
use crate::{datetime, Result, TeahouseError};

/// A single capability flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Master,
    Admin,
    Team,
    Wiki,
    News,
    Translate,
    Comment,
}

impl Capability {
    /// Every capability, in storage order.
    pub const ALL: [Capability; 7] = [
        Capability::Master,
        Capability::Admin,
        Capability::Team,
        Capability::Wiki,
        Capability::News,
        Capability::Translate,
        Capability::Comment,
    ];

    /// Wire name of the capability.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Master => "master",
            Capability::Admin => "admin",
            Capability::Team => "team",
            Capability::Wiki => "wiki",
            Capability::News => "news",
            Capability::Translate => "translate",
            Capability::Comment => "comment",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Capability {
    type Err = TeahouseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|cap| cap.as_str() == s)
            .ok_or_else(|| TeahouseError::InvalidCapability(s.to_string()))
    }
}

impl Permissions {
    /// The stored value of one flag, without the master override.
    pub fn flag(&self, capability: Capability) -> bool {
        match capability {
            Capability::Master => self.master,
            Capability::Admin => self.admin,
            Capability::Team => self.team,
            Capability::Wiki => self.wiki,
            Capability::News => self.news,
            Capability::Translate => self.translate,
            Capability::Comment => self.comment,
        }
    }

    /// Whether these permissions grant `capability`.
    pub fn allows(&self, capability: Capability) -> bool {
        self.master || self.flag(capability)
    }

    /// Admins and masters may manage other users' permissions.
    pub fn is_elevated(&self) -> bool {
        self.master || self.admin
    }
}

/// May this session perform `capability`? Evaluated at the current time.
pub fn check(session: &Session, permissions: &Permissions, capability: Capability) -> bool {
    check_at(session, permissions, capability, datetime::now())
}

/// Like [`check`], against an explicit instant.
pub fn check_at(
    session: &Session,
    permissions: &Permissions,
    capability: Capability,
    now: DateTime<Utc>,
) -> bool {
    session.is_valid_at(now) && permissions.allows(capability)
}

/// Like [`check`], with the capability given by name.
pub fn check_named(
    session: &Session,
    permissions: &Permissions,
    capability: &str,
) -> Result<bool> {
    let capability: Capability = capability.parse()?;
    Ok(check(session, permissions, capability))
}

/// Requested flag changes for another user. Absent fields stay as they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionChanges {
    pub master: Option<bool>,
    pub admin: Option<bool>,
    pub team: Option<bool>,
    pub wiki: Option<bool>,
    pub news: Option<bool>,
    pub translate: Option<bool>,
    pub comment: Option<bool>,
}

impl PermissionChanges {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `capability` to be set to `value`.
    pub fn set(mut self, capability: Capability, value: bool) -> Self {
        let slot = match capability {
            Capability::Master => &mut self.master,
            Capability::Admin => &mut self.admin,
            Capability::Team => &mut self.team,
            Capability::Wiki => &mut self.wiki,
            Capability::News => &mut self.news,
            Capability::Translate => &mut self.translate,
            Capability::Comment => &mut self.comment,
        };
        *slot = Some(value);
        self
    }

    /// The writes for the six mutable flags. `master` is never written.
    pub fn mutable_flags(&self) -> PermissionsUpdate {
        PermissionsUpdate {
            admin: self.admin,
            team: self.team,
            wiki: self.wiki,
            news: self.news,
            translate: self.translate,
            comment: self.comment,
        }
    }

    /// Apply the changes to `base`, including `master`.
    pub fn apply(&self, base: &Permissions) -> Permissions {
        Permissions {
            master: self.master.unwrap_or(base.master),
            admin: self.admin.unwrap_or(base.admin),
            team: self.team.unwrap_or(base.team),
            wiki: self.wiki.unwrap_or(base.wiki),
            news: self.news.unwrap_or(base.news),
            translate: self.translate.unwrap_or(base.translate),
            comment: self.comment.unwrap_or(base.comment),
        }
    }
}

/// Decide whether `caller` may apply `changes` to a user holding `target`.
///
/// Rules, in order:
/// 1. the caller must be an admin or a master;
/// 2. only masters may grant `admin`;
/// 3. a master's permissions are never modified, not even by another master;
/// 4. `master` itself cannot be changed (echoing the current value is allowed).
///
/// Returns the merged permission set on success.
pub fn check_elevated(
    caller: &Permissions,
    target: &Permissions,
    changes: &PermissionChanges,
) -> Result<Permissions> {
    if !caller.is_elevated() {
        return Err(TeahouseError::Forbidden(
            "admin permission required".to_string(),
        ));
    }

    if !caller.master && changes.admin == Some(true) {
        return Err(TeahouseError::Forbidden(
            "only masters may grant admin".to_string(),
        ));
    }

    if target.master {
        return Err(TeahouseError::Forbidden(
            "master permissions cannot be modified".to_string(),
        ));
    }

    if matches!(changes.master, Some(master) if master != target.master) {
        return Err(TeahouseError::InvalidOperation(
            "master cannot be set through this operation".to_string(),
        ));
    }

    Ok(changes.apply(target))
}

/// Serializable view of a permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionsView(BTreeMap<&'static str, bool>);

impl PermissionsView {
    /// Every flag with its value.
    pub fn full(permissions: &Permissions) -> Self {
        Self(
            Capability::ALL
                .into_iter()
                .map(|cap| (cap.as_str(), permissions.flag(cap)))
                .collect(),
        )
    }

    /// Only the granted flags; denied ones are hidden.
    pub fn visible(permissions: &Permissions) -> Self {
        Self(
            Capability::ALL
                .into_iter()
                .filter(|cap| permissions.flag(*cap))
                .map(|cap| (cap.as_str(), true))
                .collect(),
        )
    }

    /// Value of one flag, if present in the view.
    pub fn get(&self, capability: Capability) -> Option<bool> {
        self.0.get(capability.as_str()).copied()
    }

    /// Number of flags in the view.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the view lists no flags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(valid_before: Option<DateTime<Utc>>) -> Session {
        Session {
            token: "t".to_string(),
            user_id: 1,
            valid_after: datetime::now() - Duration::minutes(1),
            valid_before,
        }
    }

    fn admin() -> Permissions {
        Permissions {
            admin: true,
            ..Permissions::default()
        }
    }

    fn master() -> Permissions {
        Permissions {
            master: true,
            ..Permissions::default()
        }
    }

    #[test]
    fn test_capability_from_str() {
        for cap in Capability::ALL {
            assert_eq!(cap.as_str().parse::<Capability>().unwrap(), cap);
        }
        assert!(matches!(
            "wizard".parse::<Capability>(),
            Err(TeahouseError::InvalidCapability(name)) if name == "wizard"
        ));
        assert!("News".parse::<Capability>().is_err());
    }

    #[test]
    fn test_check_uses_flag() {
        let s = session(None);
        let p = Permissions::default();
        assert!(check(&s, &p, Capability::Comment));
        assert!(!check(&s, &p, Capability::News));
        assert!(!check(&s, &p, Capability::Admin));
    }

    #[test]
    fn test_master_allows_everything() {
        let s = session(None);
        let p = Permissions {
            master: true,
            comment: false,
            ..Permissions::default()
        };
        for cap in Capability::ALL {
            assert!(check(&s, &p, cap), "master should allow {cap}");
        }
    }

    #[test]
    fn test_check_requires_valid_session() {
        let expired = session(Some(datetime::now() - Duration::seconds(1)));
        assert!(!check(&expired, &master(), Capability::Comment));
    }

    #[test]
    fn test_check_at_boundary() {
        let now = datetime::now();
        let s = Session {
            token: "t".to_string(),
            user_id: 1,
            valid_after: now,
            valid_before: Some(now + Duration::hours(1)),
        };
        let p = Permissions::default();
        assert!(check_at(&s, &p, Capability::Comment, now));
        assert!(!check_at(&s, &p, Capability::Comment, now + Duration::hours(1)));
        assert!(!check_at(&s, &p, Capability::Comment, now - Duration::seconds(1)));
    }

    #[test]
    fn test_check_named() {
        let s = session(None);
        let p = Permissions::default();
        assert!(check_named(&s, &p, "comment").unwrap());
        assert!(!check_named(&s, &p, "news").unwrap());
        assert!(matches!(
            check_named(&s, &p, "superuser"),
            Err(TeahouseError::InvalidCapability(_))
        ));
    }

    #[test]
    fn test_elevated_requires_admin_or_master() {
        let caller = Permissions {
            news: true,
            team: true,
            ..Permissions::default()
        };
        let changes = PermissionChanges::new().set(Capability::Comment, false);
        assert!(matches!(
            check_elevated(&caller, &Permissions::default(), &changes),
            Err(TeahouseError::Forbidden(_))
        ));
    }

    #[test]
    fn test_non_admin_forbidden_before_target_is_inspected() {
        // Even an invalid master change against a master target reports Forbidden
        // for an unprivileged caller.
        let changes = PermissionChanges::new().set(Capability::Master, true);
        assert!(matches!(
            check_elevated(&Permissions::default(), &master(), &changes),
            Err(TeahouseError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_cannot_grant_admin() {
        let changes = PermissionChanges::new().set(Capability::Admin, true);
        for target in [Permissions::default(), admin()] {
            assert!(matches!(
                check_elevated(&admin(), &target, &changes),
                Err(TeahouseError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn test_admin_can_revoke_admin() {
        let changes = PermissionChanges::new().set(Capability::Admin, false);
        let merged = check_elevated(&admin(), &admin(), &changes).unwrap();
        assert!(!merged.admin);
    }

    #[test]
    fn test_master_can_grant_admin() {
        let changes = PermissionChanges::new().set(Capability::Admin, true);
        let merged = check_elevated(&master(), &Permissions::default(), &changes).unwrap();
        assert!(merged.admin);
    }

    #[test]
    fn test_master_target_is_immutable() {
        let changes = PermissionChanges::new().set(Capability::News, true);
        for caller in [admin(), master()] {
            assert!(matches!(
                check_elevated(&caller, &master(), &changes),
                Err(TeahouseError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn test_setting_master_is_invalid() {
        let changes = PermissionChanges::new().set(Capability::Master, true);
        for caller in [admin(), master()] {
            assert!(matches!(
                check_elevated(&caller, &Permissions::default(), &changes),
                Err(TeahouseError::InvalidOperation(_))
            ));
        }
    }

    #[test]
    fn test_echoing_current_master_value_is_ignored() {
        let changes = PermissionChanges::new()
            .set(Capability::Master, false)
            .set(Capability::Wiki, true);
        let merged = check_elevated(&admin(), &Permissions::default(), &changes).unwrap();
        assert!(!merged.master);
        assert!(merged.wiki);
    }

    #[test]
    fn test_merge_keeps_unmentioned_flags() {
        let target = Permissions {
            translate: true,
            ..Permissions::default()
        };
        let changes = PermissionChanges::new().set(Capability::News, true);
        let merged = check_elevated(&admin(), &target, &changes).unwrap();
        assert!(merged.translate);
        assert!(merged.news);
        assert!(merged.comment);
    }

    #[test]
    fn test_changes_reject_unknown_fields() {
        let ok: PermissionChanges = serde_json::from_str(r#"{"news": true}"#).unwrap();
        assert_eq!(ok.news, Some(true));
        assert!(serde_json::from_str::<PermissionChanges>(r#"{"wizard": true}"#).is_err());
    }

    #[test]
    fn test_full_view_lists_every_flag() {
        let view = PermissionsView::full(&Permissions::default());
        assert_eq!(view.len(), 7);
        assert_eq!(view.get(Capability::Comment), Some(true));
        assert_eq!(view.get(Capability::Master), Some(false));
    }

    #[test]
    fn test_visible_view_hides_denied_flags() {
        let p = Permissions {
            news: true,
            ..Permissions::default()
        };
        let view = PermissionsView::visible(&p);
        assert_eq!(view.len(), 2);
        assert_eq!(view.get(Capability::News), Some(true));
        assert_eq!(view.get(Capability::Comment), Some(true));
        assert_eq!(view.get(Capability::Admin), None);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json, serde_json::json!({"comment": true, "news": true}));
    }

    #[test]
    fn test_mutable_flags_never_carry_master() {
        let changes = PermissionChanges::new()
            .set(Capability::Master, true)
            .set(Capability::News, false);
        let update = changes.mutable_flags();

        assert_eq!(update.news, Some(false));
        assert_eq!(update.wiki, None);
        assert_eq!(update.admin, None);
    }
}
