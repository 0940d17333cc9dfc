// The `ebl` command-line driver: configuration, CSV import, scoring and the
// weekly roster move run.

pub mod commands;
pub mod import;
pub mod retry;
pub mod weekly;
