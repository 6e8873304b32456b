use std::{fmt, str::FromStr};

use uuid::Uuid;

use crate::{
    error::ModelError,
    ids::{StaffId, StudentId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Role {
    Student,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "staff" => Ok(Role::Staff),
            other => Err(ModelError::UnknownStatus {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// Caller identity supplied by the external auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn as_student(&self) -> Option<StudentId> {
        (self.role == Role::Student).then_some(StudentId(self.user_id))
    }

    pub fn as_staff(&self) -> Option<StaffId> {
        (self.role == Role::Staff).then_some(StaffId(self.user_id))
    }
}
