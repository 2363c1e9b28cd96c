//! Headless driver: applies line-based commands to a world without a window.

use std::io::Write;
use std::path::PathBuf;

use builder_engine::{
    BodyCategory, EditorCommand, GameWorld, Geometry, HorizontalDirection, ModeMachine, ObjectRef,
    PlayerIntent, ShapeId, ShapeProperty, Vec2,
};
use tracing::{debug, info};

/// Seconds advanced by one `step` tick, matching the window loop's 60 TPS.
pub(crate) const SCRIPT_TICK_SECONDS: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScriptCommand {
    Editor(EditorCommand),
    Step { ticks: u32 },
    Snapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScriptParseError {
    reason: String,
    usage: &'static str,
}

impl ScriptParseError {
    fn new(reason: impl Into<String>, usage: &'static str) -> Self {
        Self {
            reason: reason.into(),
            usage,
        }
    }
}

impl std::fmt::Display for ScriptParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error: {}. usage: {}", self.reason, self.usage)
    }
}

const PLACE_USAGE: &str = "place <rect x y w h | circle x y r | triangle x y | \
polygon x y px,py px,py px,py...> [static|dynamic]";
const MOVE_USAGE: &str = "move <player|shape_id> <x> <y>";
const DELETE_USAGE: &str = "delete <shape_id>";
const RESIZE_USAGE: &str = "resize <shape_id> <rect w h | circle r>";
const PROP_USAGE: &str = "prop <shape_id> <danger|sticky|spinning> <on|off>";
const GOAL_USAGE: &str = "goal <x> <y> | goal clear";
const CHECKPOINT_USAGE: &str = "checkpoint add <x> <y> | checkpoint remove <index>";
const TOGGLE_USAGE: &str = "toggle";
const INPUT_USAGE: &str = "input <left|right|none> [jump|tap]";
const STEP_USAGE: &str = "step <ticks>";
const SAVE_USAGE: &str = "save <path>";
const LOAD_USAGE: &str = "load <path>";
const SNAPSHOT_USAGE: &str = "snapshot";
const COMMANDS_USAGE: &str =
    "place|move|delete|resize|prop|goal|checkpoint|toggle|input|step|save|load|snapshot";

/// Non-empty lines that are not `#` comments, with their 1-based line numbers.
pub(crate) fn script_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

pub(crate) fn parse_script_command(line: &str) -> Result<ScriptCommand, ScriptParseError> {
    let mut tokens = line.split_whitespace();
    let Some(name) = tokens.next() else {
        return Err(ScriptParseError::new("empty command", COMMANDS_USAGE));
    };
    let args = tokens.collect::<Vec<_>>();
    match name.to_ascii_lowercase().as_str() {
        "place" => parse_place(&args),
        "move" => parse_move(&args),
        "delete" => {
            require_arg_count(&args, 1, DELETE_USAGE)?;
            Ok(editor(EditorCommand::DeleteShape(parse_shape_id(
                args[0],
                DELETE_USAGE,
            )?)))
        }
        "resize" => parse_resize(&args),
        "prop" => parse_prop(&args),
        "goal" => parse_goal(&args),
        "checkpoint" => parse_checkpoint(&args),
        "toggle" => {
            require_arg_count(&args, 0, TOGGLE_USAGE)?;
            Ok(editor(EditorCommand::ToggleMode))
        }
        "input" => parse_input(&args),
        "step" => {
            require_arg_count(&args, 1, STEP_USAGE)?;
            let ticks = args[0].parse::<u32>().map_err(|_| {
                ScriptParseError::new(
                    format!("invalid tick count '{}' (expected u32)", args[0]),
                    STEP_USAGE,
                )
            })?;
            Ok(ScriptCommand::Step { ticks })
        }
        "save" => {
            require_arg_count(&args, 1, SAVE_USAGE)?;
            Ok(editor(EditorCommand::Save(PathBuf::from(args[0]))))
        }
        "load" => {
            require_arg_count(&args, 1, LOAD_USAGE)?;
            Ok(editor(EditorCommand::Load(PathBuf::from(args[0]))))
        }
        "snapshot" => {
            require_arg_count(&args, 0, SNAPSHOT_USAGE)?;
            Ok(ScriptCommand::Snapshot)
        }
        other => Err(ScriptParseError::new(
            format!("unknown command '{other}'"),
            COMMANDS_USAGE,
        )),
    }
}

fn editor(command: EditorCommand) -> ScriptCommand {
    ScriptCommand::Editor(command)
}

fn parse_place(args: &[&str]) -> Result<ScriptCommand, ScriptParseError> {
    let (args, category) = match args.last().map(|last| last.to_ascii_lowercase()) {
        Some(last) if last == "static" => (&args[..args.len() - 1], BodyCategory::Static),
        Some(last) if last == "dynamic" => (&args[..args.len() - 1], BodyCategory::Dynamic),
        _ => (args, BodyCategory::Static),
    };
    if args.len() < 3 {
        return Err(ScriptParseError::new(
            "expected a kind and a position",
            PLACE_USAGE,
        ));
    }
    let position = parse_point(args[1], args[2], PLACE_USAGE)?;
    let dims = &args[3..];
    let geometry = match args[0].to_ascii_lowercase().as_str() {
        "rect" => {
            require_arg_count(dims, 2, PLACE_USAGE)?;
            Geometry::Rect {
                width: parse_f32(dims[0], "width", PLACE_USAGE)?,
                height: parse_f32(dims[1], "height", PLACE_USAGE)?,
            }
        }
        "circle" => {
            require_arg_count(dims, 1, PLACE_USAGE)?;
            Geometry::Circle {
                radius: parse_f32(dims[0], "radius", PLACE_USAGE)?,
            }
        }
        "triangle" => {
            require_arg_count(dims, 0, PLACE_USAGE)?;
            Geometry::default_triangle(1.0)
        }
        "polygon" => Geometry::Polygon {
            points: dims
                .iter()
                .map(|pair| parse_pair(pair, PLACE_USAGE))
                .collect::<Result<Vec<_>, _>>()?,
        },
        other => {
            return Err(ScriptParseError::new(
                format!("unknown shape kind '{other}' (expected rect|circle|triangle|polygon)"),
                PLACE_USAGE,
            ))
        }
    };
    Ok(editor(EditorCommand::PlaceShape {
        geometry,
        position,
        category,
    }))
}

fn parse_move(args: &[&str]) -> Result<ScriptCommand, ScriptParseError> {
    require_arg_count(args, 3, MOVE_USAGE)?;
    let target = if args[0].eq_ignore_ascii_case("player") {
        ObjectRef::Player
    } else {
        ObjectRef::Shape(parse_shape_id(args[0], MOVE_USAGE)?)
    };
    Ok(editor(EditorCommand::MoveObject {
        target,
        position: parse_point(args[1], args[2], MOVE_USAGE)?,
    }))
}

fn parse_resize(args: &[&str]) -> Result<ScriptCommand, ScriptParseError> {
    if args.len() < 2 {
        return Err(ScriptParseError::new(
            "expected <shape_id> and a geometry",
            RESIZE_USAGE,
        ));
    }
    let id = parse_shape_id(args[0], RESIZE_USAGE)?;
    let dims = &args[2..];
    let geometry = match args[1].to_ascii_lowercase().as_str() {
        "rect" => {
            require_arg_count(dims, 2, RESIZE_USAGE)?;
            Geometry::Rect {
                width: parse_f32(dims[0], "width", RESIZE_USAGE)?,
                height: parse_f32(dims[1], "height", RESIZE_USAGE)?,
            }
        }
        "circle" => {
            require_arg_count(dims, 1, RESIZE_USAGE)?;
            Geometry::Circle {
                radius: parse_f32(dims[0], "radius", RESIZE_USAGE)?,
            }
        }
        other => {
            return Err(ScriptParseError::new(
                format!("unknown geometry '{other}' (expected rect|circle)"),
                RESIZE_USAGE,
            ))
        }
    };
    Ok(editor(EditorCommand::ResizeShape { id, geometry }))
}

fn parse_prop(args: &[&str]) -> Result<ScriptCommand, ScriptParseError> {
    require_arg_count(args, 3, PROP_USAGE)?;
    let id = parse_shape_id(args[0], PROP_USAGE)?;
    let property = match args[1].to_ascii_lowercase().as_str() {
        "danger" => ShapeProperty::Danger,
        "sticky" => ShapeProperty::Sticky,
        "spinning" => ShapeProperty::Spinning,
        other => {
            return Err(ScriptParseError::new(
                format!("unknown property '{other}' (expected danger|sticky|spinning)"),
                PROP_USAGE,
            ))
        }
    };
    let enabled = match args[2].to_ascii_lowercase().as_str() {
        "on" | "true" => true,
        "off" | "false" => false,
        other => {
            return Err(ScriptParseError::new(
                format!("invalid flag '{other}' (expected on|off)"),
                PROP_USAGE,
            ))
        }
    };
    Ok(editor(EditorCommand::SetProperty {
        id,
        property,
        enabled,
    }))
}

fn parse_goal(args: &[&str]) -> Result<ScriptCommand, ScriptParseError> {
    match args {
        [clear] if clear.eq_ignore_ascii_case("clear") => Ok(editor(EditorCommand::SetGoal(None))),
        [x, y] => Ok(editor(EditorCommand::SetGoal(Some(parse_point(
            x, y, GOAL_USAGE,
        )?)))),
        _ => Err(ScriptParseError::new(
            "expected <x> <y> or 'clear'",
            GOAL_USAGE,
        )),
    }
}

fn parse_checkpoint(args: &[&str]) -> Result<ScriptCommand, ScriptParseError> {
    match args {
        [action, x, y] if action.eq_ignore_ascii_case("add") => Ok(editor(
            EditorCommand::AddCheckpoint(parse_point(x, y, CHECKPOINT_USAGE)?),
        )),
        [action, index] if action.eq_ignore_ascii_case("remove") => {
            let index = index.parse::<usize>().map_err(|_| {
                ScriptParseError::new(
                    format!("invalid checkpoint index '{index}' (expected usize)"),
                    CHECKPOINT_USAGE,
                )
            })?;
            Ok(editor(EditorCommand::RemoveCheckpoint(index)))
        }
        _ => Err(ScriptParseError::new(
            "expected 'add <x> <y>' or 'remove <index>'",
            CHECKPOINT_USAGE,
        )),
    }
}

fn parse_input(args: &[&str]) -> Result<ScriptCommand, ScriptParseError> {
    let (direction, rest) = match args.split_first() {
        Some((direction, rest)) => (*direction, rest),
        None => {
            return Err(ScriptParseError::new(
                "missing required argument <direction>",
                INPUT_USAGE,
            ))
        }
    };
    let direction = match direction.to_ascii_lowercase().as_str() {
        "left" => HorizontalDirection::Left,
        "right" => HorizontalDirection::Right,
        "none" => HorizontalDirection::None,
        other => {
            return Err(ScriptParseError::new(
                format!("unknown direction '{other}' (expected left|right|none)"),
                INPUT_USAGE,
            ))
        }
    };
    // `jump` keeps the button held until the next `input` line; `tap` releases it at once.
    let (jump_pressed, jump_held) = match rest {
        [] => (false, false),
        [jump] if jump.eq_ignore_ascii_case("jump") => (true, true),
        [tap] if tap.eq_ignore_ascii_case("tap") => (true, false),
        _ => return Err(ScriptParseError::new("unexpected extra arguments", INPUT_USAGE)),
    };
    Ok(editor(EditorCommand::PlayerInput(PlayerIntent {
        direction,
        jump_pressed,
        jump_held,
    })))
}

fn require_arg_count(
    args: &[&str],
    expected: usize,
    usage: &'static str,
) -> Result<(), ScriptParseError> {
    if args.len() == expected {
        return Ok(());
    }
    let reason = match expected {
        0 => "unexpected extra arguments".to_string(),
        1 => "expected exactly one argument".to_string(),
        n => format!("expected exactly {n} arguments, got {}", args.len()),
    };
    Err(ScriptParseError::new(reason, usage))
}

fn parse_f32(raw: &str, field: &str, usage: &'static str) -> Result<f32, ScriptParseError> {
    raw.parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| {
            ScriptParseError::new(format!("invalid {field} '{raw}' (expected f32)"), usage)
        })
}

fn parse_point(x: &str, y: &str, usage: &'static str) -> Result<Vec2, ScriptParseError> {
    Ok(Vec2::new(parse_f32(x, "x", usage)?, parse_f32(y, "y", usage)?))
}

fn parse_pair(raw: &str, usage: &'static str) -> Result<Vec2, ScriptParseError> {
    let Some((x, y)) = raw.split_once(',') else {
        return Err(ScriptParseError::new(
            format!("invalid point '{raw}' (expected x,y)"),
            usage,
        ));
    };
    parse_point(x, y, usage)
}

fn parse_shape_id(raw: &str, usage: &'static str) -> Result<ShapeId, ScriptParseError> {
    raw.parse::<u64>().map(ShapeId).map_err(|_| {
        ScriptParseError::new(format!("invalid shape id '{raw}' (expected u64)"), usage)
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ScriptSummary {
    pub(crate) commands: usize,
    pub(crate) ticks: u64,
}

/// Runs every command in order. The first failure stops the run and names its line.
pub(crate) fn run_script<W: Write>(
    content: &str,
    world: &mut GameWorld,
    machine: &mut ModeMachine,
    out: &mut W,
) -> Result<ScriptSummary, String> {
    let mut summary = ScriptSummary::default();
    for (line_number, line) in script_lines(content) {
        let command =
            parse_script_command(line).map_err(|error| format!("line {line_number}: {error}"))?;
        debug!(line = line_number, command = line, "script_command");
        execute(command, world, machine, out, &mut summary)
            .map_err(|error| format!("line {line_number}: {line}: {error}"))?;
        summary.commands += 1;
    }
    info!(
        commands = summary.commands,
        ticks = summary.ticks,
        mode = %machine.mode(),
        "script_finished"
    );
    Ok(summary)
}

fn execute<W: Write>(
    command: ScriptCommand,
    world: &mut GameWorld,
    machine: &mut ModeMachine,
    out: &mut W,
    summary: &mut ScriptSummary,
) -> Result<(), String> {
    match command {
        ScriptCommand::Editor(command) => machine
            .dispatch(command, world)
            .map_err(|error| error.to_string()),
        ScriptCommand::Step { ticks } => {
            for _ in 0..ticks {
                summary.ticks += 1;
                let outcome = machine
                    .update(SCRIPT_TICK_SECONDS, world)
                    .map_err(|error| error.to_string())?;
                if let Some(outcome) = outcome {
                    let line = serde_json::to_string(&outcome).map_err(|error| error.to_string())?;
                    writeln!(out, "{line}").map_err(|error| error.to_string())?;
                }
            }
            Ok(())
        }
        ScriptCommand::Snapshot => {
            let line = serde_json::to_string(&machine.frame(world))
                .map_err(|error| error.to_string())?;
            writeln!(out, "{line}").map_err(|error| error.to_string())
        }
    }
}
