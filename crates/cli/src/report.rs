//! Failure reporting for the process exit path.
//!
//! Inside a GitHub Actions runner the message is emitted as an `::error::`
//! workflow command so it shows up as an annotation on the failed step.

use std::error::Error;

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

/// Renders an error and its source chain as one line.
///
/// Sources whose text is already part of the outer message are skipped.
pub fn failure_message(error: &(dyn Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Formats `message` as a workflow `error` command.
pub fn workflow_error_command(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{escaped}")
}

/// Returns `true` when running as a GitHub Actions step.
pub fn running_in_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

/// Writes the failure where the invoking environment will surface it.
pub fn report_failure(error: &(dyn Error + 'static)) {
    let message = failure_message(error);
    if running_in_actions() {
        println!("{}", workflow_error_command(&message));
    } else {
        eprintln!("error: {message}");
    }
}
