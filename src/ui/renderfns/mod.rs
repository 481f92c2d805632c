pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{format_date, format_file_size, severity_color, spinner, status_color, truncate};
