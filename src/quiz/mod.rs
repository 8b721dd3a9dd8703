// src/quiz/mod.rs

//! Quiz core: question parsing, grading, analytics and recommendations.
//! Everything here is synchronous and stateless apart from the single
//! generator call in [`parser::generate`].

pub mod analyzer;
pub mod grader;
pub mod parser;
pub mod recommend;
