use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ProfessorId(pub i64);

impl fmt::Display for ProfessorId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professor {
    pub id: ProfessorId,
    pub name: String,
    pub major: String,
    pub is_active: bool,
    pub is_approved: bool,
    pub current_supervisees: u32,
    pub current_examinees: u32,
    pub max_examinees: Option<u32>,
}

impl Professor {
    pub fn new(id: ProfessorId, name: impl Into<String>) -> Self {
        Professor {
            id,
            name: name.into(),
            major: String::new(),
            is_active: true,
            is_approved: true,
            current_supervisees: 0,
            current_examinees: 0,
            max_examinees: None,
        }
    }

    /// Only active and approved faculty take part in allocations.
    pub fn is_eligible(&self) -> bool {
        self.is_active && self.is_approved
    }
}

impl fmt::Display for Professor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
