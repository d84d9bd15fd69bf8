#![forbid(unsafe_code)]

fn main() {
    if let Err(error) = caseplan_cli::run_from_env() {
        eprintln!("caseplan: {error}");
        std::process::exit(error.exit_code());
    }
}
