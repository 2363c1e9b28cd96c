use std::fs;
use std::io;
use std::process::ExitCode;

use builder_engine::{run_app, ModeMachine};
use tracing::error;

use super::bootstrap::AppWiring;
use super::script::run_script;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        mut world,
        script,
    } = app;

    if let Some(path) = script {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                error!(path = %path.display(), error = %err, "script_read_failed");
                return ExitCode::FAILURE;
            }
        };
        let mut machine = ModeMachine::new();
        let mut stdout = io::stdout().lock();
        if let Err(err) = run_script(&content, &mut world, &mut machine, &mut stdout) {
            error!(path = %path.display(), error = %err, "script_failed");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    if let Err(err) = run_app(config, world) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
