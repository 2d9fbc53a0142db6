pub mod config;
pub mod error;
pub mod lcapi;
pub mod lcdb;
pub mod lctime;
pub mod models;
pub mod schedule;
pub mod streak;
