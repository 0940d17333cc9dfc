// Weekly roster move resolution.

pub mod order;
pub mod pass;
pub mod report;
pub mod resolve;

pub use order::{order_teams, OrderEntry};
pub use pass::{process_pending_moves, MoveReport, ReportEntry};
pub use report::render_markdown;
pub use resolve::{resolve_request, AvailablePool, Resolution};
