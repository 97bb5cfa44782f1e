//! Terminal progress for a provisioning run

use indicatif::{ProgressBar, ProgressStyle};
use pgprovision_core::{ProgressCallback, ProgressEvent};
use std::sync::Arc;

/// Build a callback that prints each step and spins while the server is created
///
/// With `quiet` set, step lines are suppressed and no spinner is drawn.
pub fn reporter(quiet: bool) -> ProgressCallback {
    let pb = ProgressBar::new_spinner();
    if quiet {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]")
    {
        pb.set_style(style);
    }

    Arc::new(move |event: ProgressEvent| match &event {
        ProgressEvent::Step { description } => {
            if !quiet {
                // Plain stderr, so the line survives a hidden (non-TTY) spinner
                pb.suspend(|| eprintln!("{}", description));
            }
        }
        ProgressEvent::Started { operation } => {
            pb.enable_steady_tick(std::time::Duration::from_millis(120));
            pb.set_message(format!("Waiting for {}", operation));
        }
        ProgressEvent::Polling {
            operation, status, ..
        } => {
            pb.set_message(format!("{}: {}", operation, format_state(status)));
        }
        ProgressEvent::Completed { operation, elapsed } => {
            pb.finish_with_message(format!(
                "{}: {} in {}s",
                operation,
                format_state("Succeeded"),
                elapsed.as_secs()
            ));
        }
        ProgressEvent::Failed { operation, error } => {
            pb.abandon_with_message(format!("{} failed: {}", operation, error));
        }
    })
}

/// Status with a leading icon
fn format_state(state: &str) -> String {
    match state.to_lowercase().as_str() {
        "succeeded" => format!("\u{2713} {}", state),
        "failed" => format!("\u{2717} {}", state),
        "canceled" | "cancelled" => format!("\u{2298} {}", state),
        "inprogress" | "accepted" | "creating" | "updating" => format!("\u{21bb} {}", state),
        _ => state.to_string(),
    }
}
