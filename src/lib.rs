//! Vitalog - a health blog for doctors and patients
//!
//! Doctors publish categorized articles (or keep them as drafts); patients
//! read everything published. Accounts, sessions and uploads are handled
//! here too.

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod views;
pub mod web;
