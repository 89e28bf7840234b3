use console::style;

use crate::workflow::{PhaseStatus, StatusEvent, StatusReporter};

#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only errors and warnings are printed
    pub fn quiet(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✓").green(), message);
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn skipped(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("-").dim(), style(message).dim());
        }
    }

    pub fn header(&self, message: &str) {
        if !self.quiet {
            println!("\n{}", style(message).bold().underlined());
        }
    }

    pub fn section(&self, message: &str) {
        if !self.quiet {
            println!("\n{}", style(message).bold());
            println!("{}", "─".repeat(40));
        }
    }
}

/// Prints run status events as styled console lines
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    output: Output,
}

impl ConsoleReporter {
    pub fn new(output: Output) -> Self {
        Self { output }
    }
}

/// Console line for one event; `None` when the event is not worth a line
pub(crate) fn event_line(event: &StatusEvent) -> Option<String> {
    let label = event.phase.map(|p| p.name()).unwrap_or("Run");
    let mut line = if event.message.is_empty() {
        format!("{}: {}", label, event.status)
    } else {
        format!("{}: {}", label, event.message)
    };
    if let Some(counts) = event.counts {
        line.push_str(&format!(" [{}]", counts));
    }
    (event.status != PhaseStatus::Pending).then_some(line)
}

impl StatusReporter for ConsoleReporter {
    fn report(&self, event: &StatusEvent) {
        let Some(line) = event_line(event) else {
            return;
        };
        match event.status {
            PhaseStatus::Succeeded => self.output.success(&line),
            PhaseStatus::Cached => self.output.info(&format!("{} (cached)", line)),
            PhaseStatus::Degraded => self.output.warning(&line),
            PhaseStatus::Failed => self.output.error(&line),
            PhaseStatus::Skipped => self.output.skipped(&line),
            PhaseStatus::Running if event.phase.is_none() => self.output.header(&line),
            PhaseStatus::Running | PhaseStatus::Pending => self.output.info(&line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Phase, SectionCounts};

    #[test]
    fn test_event_line_includes_counts() {
        let event = StatusEvent::phase(Phase::Research, PhaseStatus::Degraded, "3 of 4 sections")
            .with_counts(Some(SectionCounts {
                succeeded: 3,
                recovered: 1,
                failed: 1,
                skipped: 0,
            }));
        assert_eq!(
            event_line(&event).unwrap(),
            "Research: 3 of 4 sections [3 ok (1 recovered), 1 failed]"
        );
    }

    #[test]
    fn test_event_line_falls_back_to_status() {
        let event = StatusEvent::run(PhaseStatus::Succeeded, "", true);
        assert_eq!(event_line(&event).unwrap(), "Run: succeeded");

        let pending = StatusEvent::phase(Phase::Plan, PhaseStatus::Pending, "queued");
        assert!(event_line(&pending).is_none());
    }
}
