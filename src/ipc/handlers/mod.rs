pub mod auth;
pub mod core;
pub mod directory;
pub mod forms;
pub mod monitor;
pub mod profile;
pub mod submissions;
pub mod users;
