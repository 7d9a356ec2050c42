//! Address tables, the correction rules that read them, and conflict
//! resolution that writes them back.
//!
//! Data flows one way: [tables] loads the CSVs, [view] joins them into one
//! row per (entity, address) link, [rules] turn the view into proposals, and
//! [resolve] applies those to the tables. [commands] wires this up for the
//! CLI.

pub(crate) mod commands;
pub(crate) mod fuzzy;
pub(crate) mod models;
pub(crate) mod resolve;
pub(crate) mod rules;
pub(crate) mod tables;
pub(crate) mod view;
