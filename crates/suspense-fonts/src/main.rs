//! fontloader.
//!
//! Loads font families the way a screen full of components would: every font is read through a
//! single-flight suspending cache, and the screen is re-rendered until no component is waiting
//! for its font anymore.

#![warn(missing_debug_implementations, clippy::all)]

mod cli;
mod output;

fn main() {
    match cli::execute() {
        Ok(()) => std::process::exit(0),
        Err(error) => {
            suspense_fonts::logging::ensure_log_error(&error);
            std::process::exit(1);
        }
    }
}
