use std::path::PathBuf;

use builder_engine::{load_level, resolve_level_path, GameWorld, LoopConfig, WorldConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CliOptions {
    pub(crate) level: Option<PathBuf>,
    pub(crate) script: Option<PathBuf>,
    pub(crate) help: bool,
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) world: GameWorld,
    pub(crate) script: Option<PathBuf>,
}

pub(crate) fn usage_text() -> String {
    [
        "usage: level_builder [--level <path>] [--script <path>] [--help]",
        "",
        "  --level <path>   level file to edit (default: $LEVEL_BUILDER_LEVEL or level.json)",
        "  --script <path>  run editor commands from a file without opening a window",
        "  --help           print this message",
    ]
    .join("\n")
}

pub(crate) fn parse_cli_args(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => {
                options.help = true;
                index += 1;
            }
            "--level" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --level".to_string())?;
                options.level = Some(PathBuf::from(value));
                index += 2;
            }
            "--script" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --script".to_string())?;
                options.script = Some(PathBuf::from(value));
                index += 2;
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(options)
}

pub(crate) fn build_app(options: CliOptions) -> Result<AppWiring, String> {
    init_tracing();
    info!("=== Level Builder Startup ===");

    let explicit_level = options.level.is_some();
    let level_path = resolve_level_path(options.level).map_err(|error| error.to_string())?;
    let mut world = GameWorld::new(WorldConfig::default());

    // The windowed editor loads its own level; scripts only start from an explicit one.
    if options.script.is_some() && explicit_level {
        load_level(&mut world, &level_path).map_err(|error| error.to_string())?;
    }

    let config = LoopConfig {
        level_path,
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        world,
        script: options.script,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn no_arguments_opens_the_editor() {
        assert_eq!(parse_cli_args(&[]), Ok(CliOptions::default()));
    }

    #[test]
    fn level_and_script_paths_are_captured() {
        let options =
            parse_cli_args(&args(&["--level", "a.json", "--script", "run.txt"])).expect("options");
        assert_eq!(options.level, Some(PathBuf::from("a.json")));
        assert_eq!(options.script, Some(PathBuf::from("run.txt")));
        assert!(!options.help);
    }

    #[test]
    fn missing_values_and_unknown_flags_are_errors() {
        assert_eq!(
            parse_cli_args(&args(&["--level"])),
            Err("missing value for --level".to_string())
        );
        assert_eq!(
            parse_cli_args(&args(&["--fast"])),
            Err("unknown argument '--fast'".to_string())
        );
    }

    #[test]
    fn help_flag_is_recognized() {
        assert!(parse_cli_args(&args(&["-h"])).expect("options").help);
        assert!(usage_text().contains("--script <path>"));
    }
}
