pub mod cli;
pub mod commands;
pub mod config;
pub mod enroll;
pub mod errors;
pub mod output;
pub mod recognize;
pub mod users;
