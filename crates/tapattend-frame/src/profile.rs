use serde::{Deserialize, Serialize};

use crate::marker::Marker;

/// Student profile cached on a tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Numeric institutional identifier (CIN).
    pub identifier: String,
    pub first_name: String,
    pub last_name: String,
    pub major: String,
}

impl StudentProfile {
    /// Create a new profile.
    pub fn new(
        identifier: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        major: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            major: major.into(),
        }
    }

    /// Value of a field by its marker. The terminator has no value.
    pub fn field(&self, marker: Marker) -> &str {
        match marker {
            Marker::Identifier => &self.identifier,
            Marker::FirstName => &self.first_name,
            Marker::LastName => &self.last_name,
            Marker::Major => &self.major,
            Marker::End => "",
        }
    }

    /// "First Last", as shown in notices.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
