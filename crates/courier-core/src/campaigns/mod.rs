//! Campaign scheduling: recurrence evaluation and per-contact rules

mod recurrence;
mod rules;
mod scheduler;

pub use recurrence::{RecurrenceError, RecurrenceRule, RecurrenceSpec};
pub use rules::{contact_is_eligible, evaluate_condition};
pub use scheduler::CampaignScheduler;
