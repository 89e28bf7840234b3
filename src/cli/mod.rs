pub mod commands;
pub mod ui;
pub mod util;

pub use ui::{ConsoleReporter, Output};
pub use util::{CommandContext, resolve_run};
