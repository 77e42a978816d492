pub mod history;
pub mod statistics;
pub mod workout;

pub use history::{group_by_day, WorkoutGroup};
pub use statistics::{summarize, StatisticsByCategory, WorkoutStatistics};
pub use workout::{WorkoutCategory, WorkoutRecord};
