//! User accounts and roles.
//!
//! # Invariants
//! - `email` is unique case-insensitively.
//! - `cpf` is stored as exactly 11 ASCII digits.
//! - Password hashes never leave the repository layer in read models.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Store-generated user identifier.
pub type UserId = i64;

/// Account role; decides which home area a user lands on after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Private individual party to cases.
    Citizen,
    /// Judge; owns hearings.
    Judge,
    /// Lawyer or law firm.
    LegalEntity,
    /// Court staff.
    PublicServant,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Citizen,
        Role::Judge,
        Role::LegalEntity,
        Role::PublicServant,
    ];

    /// Canonical storage text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::Judge => "judge",
            Self::LegalEntity => "legal_entity",
            Self::PublicServant => "public_servant",
        }
    }

    /// Parses canonical names and the front-end aliases, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "citizen" | "cidadao" => Some(Self::Citizen),
            "judge" | "juiz" => Some(Self::Judge),
            "legal_entity" | "empresa_juridica" | "advogado" | "lawyer" => {
                Some(Self::LegalEntity)
            }
            "public_servant" | "servidor_publico" | "servidor" => Some(Self::PublicServant),
            _ => None,
        }
    }

    /// Front-end route a user of this role is sent to after login.
    pub fn home_route(self) -> &'static str {
        match self {
            Self::Citizen => "/home-cidadao",
            Self::Judge => "/home-juiz",
            Self::LegalEntity => "/home-advogado",
            Self::PublicServant => "/home-servidor",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account data safe to hand to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub cpf: String,
    pub phone: Option<String>,
    pub full_name: String,
    pub role: Role,
}

/// Validated registration data ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub cpf: String,
    pub phone: Option<String>,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn parse_accepts_aliases_and_round_trips_canonical_names() {
        assert_eq!(Role::parse("Juiz"), Some(Role::Judge));
        assert_eq!(Role::parse("empresa_juridica"), Some(Role::LegalEntity));
        assert_eq!(Role::parse(" cidadao "), Some(Role::Citizen));
        assert_eq!(Role::parse("mayor"), None);
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn every_role_has_a_home_route() {
        assert_eq!(Role::Judge.home_route(), "/home-juiz");
        assert_eq!(Role::LegalEntity.home_route(), "/home-advogado");
        assert!(Role::ALL.iter().all(|role| role.home_route().starts_with("/home-")));
    }

    #[test]
    fn serde_uses_storage_names() {
        assert_eq!(
            serde_json::to_string(&Role::PublicServant).unwrap(),
            "\"public_servant\""
        );
        let role: Role = serde_json::from_str("\"legal_entity\"").unwrap();
        assert_eq!(role, Role::LegalEntity);
    }
}
