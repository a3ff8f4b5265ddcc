pub mod applications;
pub mod auth;
pub mod avatar;
pub mod backend;
pub mod bio;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod jobs;
pub mod models;
pub mod profile;
pub mod records;
pub mod state;
pub mod storage;
pub mod utils;
pub mod validation;
