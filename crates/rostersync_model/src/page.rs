//! Application pages and the entity kinds each one shows.

use crate::kind::EntityKind;
use std::fmt;
use std::str::FromStr;

/// A navigable page of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    /// Overview of upcoming shifts and guests.
    Dashboard,
    /// Guest list.
    Guests,
    /// Volunteer roster.
    Volunteers,
    /// Job editor.
    Jobs,
    /// Shift calendar.
    Schedule,
    /// Job type configuration.
    JobTypes,
    /// Venue list.
    Venues,
    /// Hours and rank reports.
    Reports,
    /// Application settings.
    Settings,
}

impl Page {
    /// Every page.
    pub const ALL: [Page; 9] = [
        Page::Dashboard,
        Page::Guests,
        Page::Volunteers,
        Page::Jobs,
        Page::Schedule,
        Page::JobTypes,
        Page::Venues,
        Page::Reports,
        Page::Settings,
    ];

    /// Entity kinds displayed or edited on this page.
    pub fn kinds(&self) -> &'static [EntityKind] {
        use EntityKind::*;
        match self {
            Page::Dashboard => &[Guest, Volunteer, Job],
            Page::Guests => &[Guest, Venue],
            Page::Volunteers => &[Volunteer],
            Page::Jobs => &[Job, Volunteer, JobTypeConfig, Venue],
            Page::Schedule => &[Job, Volunteer],
            Page::JobTypes => &[JobTypeConfig],
            Page::Venues => &[Venue],
            Page::Reports => &[Volunteer, Job],
            Page::Settings => &[],
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Guests => "guests",
            Page::Volunteers => "volunteers",
            Page::Jobs => "jobs",
            Page::Schedule => "schedule",
            Page::JobTypes => "job_types",
            Page::Venues => "venues",
            Page::Reports => "reports",
            Page::Settings => "settings",
        }
    }
}

/// Kinds to refresh when navigating from `from` to `to`.
///
/// The union of both pages' kinds, in `EntityKind::ALL` order.
pub fn kinds_for_navigation(from: Page, to: Page) -> Vec<EntityKind> {
    EntityKind::ALL
        .into_iter()
        .filter(|k| from.kinds().contains(k) || to.kinds().contains(k))
        .collect()
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown page name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown page: {0}")]
pub struct ParsePageError(pub String);

impl FromStr for Page {
    type Err = ParsePageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Page::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| ParsePageError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_unions_both_pages() {
        assert_eq!(
            kinds_for_navigation(Page::Guests, Page::Volunteers),
            vec![EntityKind::Guest, EntityKind::Volunteer, EntityKind::Venue]
        );
    }

    #[test]
    fn settings_to_settings_touches_nothing() {
        assert!(kinds_for_navigation(Page::Settings, Page::Settings).is_empty());
    }

    #[test]
    fn parse_page_names() {
        assert_eq!("job-types".parse::<Page>(), Ok(Page::JobTypes));
        assert_eq!("Dashboard".parse::<Page>(), Ok(Page::Dashboard));
        assert!("inbox".parse::<Page>().is_err());
    }
}
