//! vendordash library
//!
//! Cached, optimistic views of a marketplace vendor's dashboard, packages
//! and availability, plus the CLI that drives them.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod data;
pub mod output;
pub mod views;
