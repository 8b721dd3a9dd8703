// src/services/mod.rs

pub mod generator;
pub mod store;
