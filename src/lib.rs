//! Site measurement dashboard: loads GDP reference data and TLUP/ATLUP site
//! tables, lets the user pick a site, and shows its rows, location and images.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod state;
pub mod ui;
