//! Keyword contrast analysis: retrieve sentences per keyword group from a
//! corpus search backend, train a linear classifier over them and report the
//! most distinctive words of each group.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod job;
pub mod logging;
pub mod model;
pub mod report;
pub mod web;
