/// HTTP route handlers, one module per resource
pub mod auth;
pub mod health;
pub mod modules;
pub mod projects;
pub mod tasks;
pub mod team;
pub mod time_entries;
pub mod users;
