//! Record markers.
//!
//! Markers appear in a fixed order, each immediately followed by its value.
//! The terminator carries no value.

use std::fmt;

/// A literal marker in the record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Identifier,
    FirstName,
    LastName,
    Major,
    End,
}

/// Value-carrying markers in wire order.
pub const FIELD_ORDER: [Marker; 4] = [
    Marker::Identifier,
    Marker::FirstName,
    Marker::LastName,
    Marker::Major,
];

impl Marker {
    /// The literal marker text written to the tag.
    pub const fn text(self) -> &'static str {
        match self {
            Marker::Identifier => "CinNumber",
            Marker::FirstName => "FirstName",
            Marker::LastName => "LastName",
            Marker::Major => "Major",
            Marker::End => "End",
        }
    }

    /// The marker that follows this one, if any.
    pub const fn next(self) -> Option<Marker> {
        match self {
            Marker::Identifier => Some(Marker::FirstName),
            Marker::FirstName => Some(Marker::LastName),
            Marker::LastName => Some(Marker::Major),
            Marker::Major => Some(Marker::End),
            Marker::End => None,
        }
    }

    /// Human-readable field name.
    pub const fn label(self) -> &'static str {
        match self {
            Marker::Identifier => "identifier",
            Marker::FirstName => "first name",
            Marker::LastName => "last name",
            Marker::Major => "major",
            Marker::End => "terminator",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Total length of all marker text in one record.
pub const MARKER_OVERHEAD: usize = Marker::Identifier.text().len()
    + Marker::FirstName.text().len()
    + Marker::LastName.text().len()
    + Marker::Major.text().len()
    + Marker::End.text().len();
