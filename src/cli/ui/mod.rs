mod output;

pub use output::{ConsoleReporter, Output};
