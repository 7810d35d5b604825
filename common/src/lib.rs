pub mod aggregate;
pub mod config;
pub mod loader;
pub mod record;
pub mod spec;
pub mod util;

pub const DEFAULT_COLORS: &str = "#373478,#702670,#93A638,#AC913A";
