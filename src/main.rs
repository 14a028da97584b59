use std::sync::atomic::{AtomicBool, Ordering};

use axiom::status::ExitStatus;
use axiom::{core, signals};

/// Entry point - catches Ctrl+C and calls core::run()
fn main() -> ExitStatus {
    // The handler only sets a flag so running batches can close cleanly
    ctrlc::set_handler(move || {
        signals::set_interrupted();
        eprintln!("\nInterrupted");

        // Second Ctrl+C exits without waiting
        static SECOND_CTRL_C: AtomicBool = AtomicBool::new(false);
        if SECOND_CTRL_C.swap(true, Ordering::SeqCst) {
            std::process::exit(ExitStatus::Interrupted as i32);
        }
    })
    .ok();

    let args: Vec<String> = std::env::args().collect();
    let status = core::run(args);

    if signals::was_interrupted() {
        return ExitStatus::Interrupted;
    }

    status
}
