mod bootstrap;
mod loop_runner;
mod script;

pub(crate) use bootstrap::{build_app, parse_cli_args, usage_text};
pub(crate) use loop_runner::run;
