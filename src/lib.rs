pub mod backfill;
pub mod config;
pub mod confirmation;
pub mod constituency;
pub mod error;
pub mod listing;
pub mod logging;
pub mod mailer;
pub mod params;
pub mod petition;
pub mod signature;
pub mod stage;
pub mod store;
pub mod types;
pub mod utils;
pub mod validation;
pub mod web;
