pub mod submission;
pub mod sync_state;
pub mod weekly;
pub mod workout;

pub use submission::{Activity, Submission, SubmissionError};
pub use sync_state::SyncState;
pub use weekly::{
  CalendarWeek, CombinedRow, PersonStats, PersonWeek, WeekMetrics, WeeklyAggregate, WinTally,
  Winner, WinnerLookup,
};
pub use workout::{iso_week, week_start_of, Person, Roster, WorkoutRecord};
