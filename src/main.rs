//! passive-rec CLI binary.
//!
//! All logic lives in the library; main only maps the result to an exit code.

fn main() {
    if let Err(err) = passive_rec::cli::run() {
        eprintln!("passive-rec: {err}");
        std::process::exit(err.exit_code());
    }
}
