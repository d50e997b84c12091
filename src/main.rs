mod cli;

use std::process;

fn main() {
    afklar::logging::init();

    if let Err(e) = cli::run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
