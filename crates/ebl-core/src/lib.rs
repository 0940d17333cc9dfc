// Library root: league model, configuration and the SQLite store that the
// scoring and roster move crates build on.

pub mod config;
pub mod db;
pub mod model;
pub mod store;
