//! The five record kinds.

mod guest;
mod job;
mod job_type;
mod venue;
mod volunteer;

pub use guest::Guest;
pub use job::Job;
pub use job_type::JobTypeConfig;
pub use venue::Venue;
pub use volunteer::Volunteer;
