pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod reactions;
pub mod uploads;
pub mod users;
