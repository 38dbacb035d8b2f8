use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};

/// Progress tracking for the three collection phases
pub struct PhaseProgress {
    pb: ProgressBar,
    enabled: bool,
}

impl PhaseProgress {
    pub fn start_phase_1(enabled: bool) -> Self {
        if enabled {
            eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        }
        let pb = create_spinner(
            enabled,
            bright_yellow("Phase 1/3: Resolving project and release definition").to_string(),
        );
        Self { pb, enabled }
    }

    pub fn finish_phase_1_start_phase_2(self) -> Self {
        self.pb.finish_with_message(
            bright_green("Phase 1/3: Resolved project and release definition ✓").to_string(),
        );
        let pb = create_spinner(
            self.enabled,
            bright_yellow("Phase 2/3: Listing release environments").to_string(),
        );
        Self { pb, ..self }
    }

    pub fn finish_phase_2_start_phase_3(self, environment_count: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!(
                "Phase 2/3: Found {environment_count} successful deployments ✓"
            ))
            .to_string(),
        );
        let pb = create_spinner(
            self.enabled,
            bright_yellow("Phase 3/3: Correlating artifacts with pull requests").to_string(),
        );
        Self { pb, ..self }
    }

    pub fn finish_phase_3(self, record_count: usize) {
        self.pb.finish_with_message(
            bright_green(format!("Phase 3/3: Measured {record_count} deployments ✓")).to_string(),
        );
        if self.enabled {
            eprintln!();
        }
    }

    /// Clears the running spinner when `result` is an error, so a failed
    /// phase leaves no stale line above the error message.
    pub fn clear_on_error<T, E>(&self, result: Result<T, E>) -> Result<T, E> {
        if result.is_err() {
            self.pb.finish_and_clear();
        }
        result
    }
}

fn create_spinner(enabled: bool, message: String) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_on_error_finishes_spinner() {
        let progress = PhaseProgress::start_phase_1(false);

        let result: Result<(), &str> = progress.clear_on_error(Err("not found"));

        assert_eq!(result, Err("not found"));
        assert!(progress.pb.is_finished());
    }

    #[test]
    fn test_clear_on_error_keeps_spinner_on_success() {
        let progress = PhaseProgress::start_phase_1(false);

        assert_eq!(progress.clear_on_error::<u8, ()>(Ok(1)), Ok(1));
        assert!(!progress.pb.is_finished());
    }
}
