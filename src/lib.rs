// Library exports for EventNow
// The binary and the integration tests both build on these modules

pub mod admin;
pub mod auth;
pub mod comments;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod extractors;
pub mod notify;
pub mod recommendations;
pub mod registrations;
pub mod routes;
pub mod state;
pub mod users;
