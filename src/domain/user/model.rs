use chrono::{DateTime, Utc};

/// Staff / patient role within the hospital.
///
/// Roles are a closed set; route access is decided by set membership
/// against a per-route allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserRole {
    Admin,
    Doctor,
    Nurse,
    Pharmacist,
    LabTechnician,
    Receptionist,
    Patient,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Patient
    }
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Doctor => "doctor",
            UserRole::Nurse => "nurse",
            UserRole::Pharmacist => "pharmacist",
            UserRole::LabTechnician => "lab_technician",
            UserRole::Receptionist => "receptionist",
            UserRole::Patient => "patient",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(UserRole::Admin),
            "doctor" => Some(UserRole::Doctor),
            "nurse" => Some(UserRole::Nurse),
            "pharmacist" => Some(UserRole::Pharmacist),
            "lab_technician" => Some(UserRole::LabTechnician),
            "receptionist" => Some(UserRole::Receptionist),
            "patient" => Some(UserRole::Patient),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User model
#[derive(Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    /// Timestamp of the last password change. Tokens issued strictly
    /// before this moment are rejected by the auth middleware.
    pub password_changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_string() {
        for role in [
            UserRole::Admin,
            UserRole::Doctor,
            UserRole::Nurse,
            UserRole::Pharmacist,
            UserRole::LabTechnician,
            UserRole::Receptionist,
            UserRole::Patient,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!(UserRole::parse("superuser"), None);
    }
}
