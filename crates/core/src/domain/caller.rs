use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff,
    Judge,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Judge => "judge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "staff" => Some(Self::Staff),
            "judge" => Some(Self::Judge),
            _ => None,
        }
    }
}

/// Identity of whoever is invoking a core operation.
///
/// Authentication happens upstream; the core only checks that a role is
/// present and sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Caller {
    pub role: Option<Role>,
    pub actor_id: Option<Uuid>,
}

impl Caller {
    pub fn new(role: Role, actor_id: Option<Uuid>) -> Self {
        Self {
            role: Some(role),
            actor_id,
        }
    }

    pub fn admin() -> Self {
        Self::new(Role::Admin, None)
    }

    pub fn staff() -> Self {
        Self::new(Role::Staff, None)
    }

    pub fn judge(judge_id: Uuid) -> Self {
        Self::new(Role::Judge, Some(judge_id))
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    fn role(&self) -> Result<Role, CoreError> {
        self.role.ok_or(CoreError::MissingRole)
    }

    pub fn require_admin(&self) -> Result<(), CoreError> {
        match self.role()? {
            Role::Admin => Ok(()),
            other => Err(CoreError::Unauthorized(format!(
                "admin role required, caller is {}",
                other.as_str()
            ))),
        }
    }

    /// Staff-level operations are open to admins as well.
    pub fn require_staff(&self) -> Result<(), CoreError> {
        match self.role()? {
            Role::Admin | Role::Staff => Ok(()),
            other => Err(CoreError::Unauthorized(format!(
                "staff role required, caller is {}",
                other.as_str()
            ))),
        }
    }

    /// Judges may only act for themselves; admins may act for any judge.
    pub fn require_judge(&self, judge_id: Uuid) -> Result<(), CoreError> {
        match self.role()? {
            Role::Admin => Ok(()),
            Role::Judge if self.actor_id == Some(judge_id) => Ok(()),
            Role::Judge => Err(CoreError::Unauthorized(
                "judges may only act on their own scores".to_string(),
            )),
            Role::Staff => Err(CoreError::Unauthorized(
                "judge role required, caller is staff".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse(" Judge "), Some(Role::Judge));
        assert_eq!(Role::parse("viewer"), None);
    }

    #[test]
    fn test_missing_role_is_rejected() {
        let caller = Caller::anonymous();
        assert!(matches!(
            caller.require_staff(),
            Err(CoreError::MissingRole)
        ));
        assert!(caller.require_admin().is_err());
    }

    #[test]
    fn test_admin_passes_every_check() {
        let caller = Caller::admin();
        assert!(caller.require_admin().is_ok());
        assert!(caller.require_staff().is_ok());
        assert!(caller.require_judge(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_staff_is_not_admin() {
        let caller = Caller::staff();
        assert!(caller.require_staff().is_ok());
        assert!(caller.require_admin().is_err());
    }

    #[test]
    fn test_judge_acts_only_for_self() {
        let judge_id = Uuid::new_v4();
        let caller = Caller::judge(judge_id);

        assert!(caller.require_judge(judge_id).is_ok());
        assert!(caller.require_judge(Uuid::new_v4()).is_err());
        assert!(caller.require_staff().is_err());
    }
}
