pub mod container;
pub mod health;
pub mod kernel;
pub mod network;
pub mod plugin;
pub mod run;
pub mod volume;

use berth_core::ProgressEvent;

/// Prints pipeline progress to stderr as it streams in.
pub fn print_progress(event: &ProgressEvent) {
    match event {
        ProgressEvent::Update {
            description: Some(description),
            ..
        } => eprintln!("{description}"),
        ProgressEvent::Update {
            processed: Some(processed),
            total: Some(total),
            ..
        } => eprintln!("  {processed}/{total}"),
        _ => {}
    }
}
