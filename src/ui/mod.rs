pub mod icons;
pub mod summary;

pub use summary::{print_run_summary, print_watermarks};
