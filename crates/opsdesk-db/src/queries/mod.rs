pub mod api_keys;
pub mod attachments;
pub mod clients;
pub mod notifications;
pub mod projects;
pub mod tasks;
pub mod time_entries;
