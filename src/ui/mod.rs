//! Console output

pub mod report;
