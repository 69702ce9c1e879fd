use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of clinic staff roles.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin,
    #[default]
    Practitioner,
    Receptionist,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Practitioner => "practitioner",
            Role::Receptionist => "receptionist",
            Role::Manager => "manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "practitioner" => Ok(Role::Practitioner),
            "receptionist" => Ok(Role::Receptionist),
            "manager" => Ok(Role::Manager),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// User claims as returned by the identity endpoints (`userInfo` on login, `/api/Auth/user-info`).
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfo {
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub tenant_id: Option<String>,
    pub clinic_id: Option<String>,
    pub role: Option<Role>,
    pub employee_id: Option<String>,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
}

/// The signed-in staff member, read-only until the next login or user-info refresh.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

impl UserProfile {
    /// Build a profile from identity claims. `fallback_email` is the address the
    /// user signed in with, used when the claims leave id or email out.
    pub fn from_user_info(info: UserInfo, fallback_email: &str) -> Self {
        let email = non_empty(info.email).unwrap_or_else(|| fallback_email.to_string());
        let id = non_empty(info.id)
            .or_else(|| non_empty(info.username))
            .unwrap_or_else(|| email.clone());

        let name = [info.first_name.as_deref(), info.last_name.as_deref()]
            .iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let name = if name.is_empty() { email.clone() } else { name };

        let tenant_id = non_empty(info.tenant_id);
        let clinic_id = non_empty(info.clinic_id).or_else(|| tenant_id.clone());

        UserProfile {
            id,
            name,
            email,
            email_verified: info.email_verified.unwrap_or(false),
            phone_number: non_empty(info.phone_number),
            tenant_id,
            clinic_id,
            role: info.role.unwrap_or_default(),
            employee_id: non_empty(info.employee_id),
            license_number: non_empty(info.license_number),
            specialization: non_empty(info.specialization),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parses_case_insensitively() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" manager ".parse::<Role>(), Ok(Role::Manager));
        assert!("doctor".parse::<Role>().is_err());
    }

    #[test]
    fn test_unknown_role_fails_schema() {
        let result = serde_json::from_str::<UserInfo>(r#"{"email": "a@b.c", "role": "janitor"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_profile_fallbacks() {
        let info: UserInfo = serde_json::from_str(
            r#"{"firstName": "Ada", "lastName": "", "tenantId": "t-1", "employeeId": ""}"#,
        )
        .unwrap();
        let profile = UserProfile::from_user_info(info, "ada@clinic.test");

        assert_eq!(profile.id, "ada@clinic.test");
        assert_eq!(profile.email, "ada@clinic.test");
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.tenant_id.as_deref(), Some("t-1"));
        assert_eq!(profile.clinic_id.as_deref(), Some("t-1"));
        assert_eq!(profile.role, Role::Practitioner);
        assert_eq!(profile.employee_id, None);
    }

    #[test]
    fn test_profile_prefers_claims() {
        let info: UserInfo = serde_json::from_str(
            r#"{"id": "u-9", "email": "grace@clinic.test", "firstName": "Grace", "lastName": "Hopper",
                "tenantId": "t-1", "clinicId": "c-2", "role": "Receptionist", "emailVerified": true}"#,
        )
        .unwrap();
        let profile = UserProfile::from_user_info(info, "other@clinic.test");

        assert_eq!(profile.id, "u-9");
        assert_eq!(profile.email, "grace@clinic.test");
        assert_eq!(profile.name, "Grace Hopper");
        assert_eq!(profile.clinic_id.as_deref(), Some("c-2"));
        assert_eq!(profile.role, Role::Receptionist);
        assert!(profile.email_verified);
    }
}
