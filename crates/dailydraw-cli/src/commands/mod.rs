pub mod config;
pub mod entries;
pub mod notifications;
pub mod run;
pub mod status;
