// src/models/mod.rs

pub mod analytics;
pub mod history;
pub mod question;
pub mod quiz_result;
pub mod session;
