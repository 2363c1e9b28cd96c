use std::env;
use std::process::ExitCode;

mod app;

fn main() -> ExitCode {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let options = match app::parse_cli_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}\n\n{}", app::usage_text());
            return ExitCode::from(2);
        }
    };
    if options.help {
        println!("{}", app::usage_text());
        return ExitCode::SUCCESS;
    }

    match app::build_app(options) {
        Ok(wiring) => app::run(wiring),
        Err(message) => {
            tracing::error!(error = %message, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
