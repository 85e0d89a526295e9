use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Client,
    ServiceEmployee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Client => "CLIENT",
            Role::ServiceEmployee => "SERVICE_EMPLOYEE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "MANAGER" => Some(Role::Manager),
            "CLIENT" => Some(Role::Client),
            "SERVICE_EMPLOYEE" | "EMPLOYEE" => Some(Role::ServiceEmployee),
            _ => None,
        }
    }

    pub fn is_employee(&self) -> bool {
        matches!(self, Role::ServiceEmployee)
    }
}

/// Identity asserted by the upstream identity provider for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn has_any(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("manager"), Some(Role::Manager));
        assert_eq!(Role::parse("SERVICE_EMPLOYEE"), Some(Role::ServiceEmployee));
        assert_eq!(Role::parse("janitor"), None);
        assert!(Role::ServiceEmployee.is_employee());
        assert!(!Role::Manager.is_employee());
    }

    #[test]
    fn test_role_serde_matches_as_str() {
        let json = serde_json::to_string(&Role::ServiceEmployee).unwrap();
        assert_eq!(json, format!("\"{}\"", Role::ServiceEmployee.as_str()));
    }
}
