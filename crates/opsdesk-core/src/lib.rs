pub mod api_key;
pub mod attachment;
pub mod client;
pub mod money;
pub mod notification;
pub mod patch;
pub mod project;
pub mod report;
pub mod sort;
pub mod task;
pub mod time_entry;
pub mod validate;

pub use client::{Client, ClientStatus};
pub use project::{Project, ProjectStatus};
pub use sort::SortDir;
pub use task::{Priority, Task, TaskStatus};
pub use time_entry::TimeEntry;
