//! User-facing reports.
//!
//! Everything here goes to stderr: stdout belongs to the jailed program.

use minicurn_common::error::MinicurnError;
use minicurn_runtime::launcher::LaunchReport;

/// Line printed once the child has terminated.
#[must_use]
pub fn termination_message(report: &LaunchReport) -> String {
    if report.outcome.success() {
        "Child terminated".to_string()
    } else {
        format!("Child terminated ({})", report.outcome)
    }
}

/// Reports that the child has terminated.
#[allow(clippy::print_stderr)]
pub fn report_termination(report: &LaunchReport) {
    eprintln!("{}", termination_message(report));
}

/// Reports an error detected before clap or the launcher run.
#[allow(clippy::print_stderr)]
pub fn report_error(error: &MinicurnError) {
    eprintln!("{error}");
}
