//! Entity kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of records kept in sync with the remote sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Invited guests.
    Guest,
    /// Volunteers.
    Volunteer,
    /// Shifts worked by volunteers.
    Job,
    /// Job type configuration.
    JobTypeConfig,
    /// Venues.
    Venue,
}

impl EntityKind {
    /// Every kind, in the order operations visit them.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Guest,
        EntityKind::Volunteer,
        EntityKind::Job,
        EntityKind::JobTypeConfig,
        EntityKind::Venue,
    ];

    /// Returns the stable snake_case name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Guest => "guest",
            EntityKind::Volunteer => "volunteer",
            EntityKind::Job => "job",
            EntityKind::JobTypeConfig => "job_type_config",
            EntityKind::Venue => "venue",
        }
    }

    /// Returns the name of the remote sheet holding this kind.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            EntityKind::Guest => "Guests",
            EntityKind::Volunteer => "Volunteers",
            EntityKind::Job => "Jobs",
            EntityKind::JobTypeConfig => "JobTypes",
            EntityKind::Venue => "Venues",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown entity kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for EntityKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase().replace('-', "_");
        match lowered.as_str() {
            "guest" | "guests" => Ok(EntityKind::Guest),
            "volunteer" | "volunteers" => Ok(EntityKind::Volunteer),
            "job" | "jobs" => Ok(EntityKind::Job),
            "job_type_config" | "job_type" | "job_types" | "jobtypes" => {
                Ok(EntityKind::JobTypeConfig)
            }
            "venue" | "venues" => Ok(EntityKind::Venue),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_sheet_and_snake_names() {
        assert_eq!("Guests".parse::<EntityKind>(), Ok(EntityKind::Guest));
        assert_eq!("job-types".parse::<EntityKind>(), Ok(EntityKind::JobTypeConfig));
        assert_eq!("venue".parse::<EntityKind>(), Ok(EntityKind::Venue));
        assert!("shifts".parse::<EntityKind>().is_err());
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.to_string().parse::<EntityKind>(), Ok(kind));
        }
    }
}
