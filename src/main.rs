use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use glyphdot::config::{Cap, Join};
use glyphdot::ufo::{effects_for, find_instance, transform_font, Instance, TransformOptions};
use glyphdot::{Effect, KurboStroker, ParamLayers};
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "glyphdot", about = "Turn UFO glyph outlines into dots or strokes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace every outline with evenly spaced dots
    Dot {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        dots: DotArgs,
    },
    /// Replace every outline with a constant-width stroke
    Stroke {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        stroke: StrokeArgs,
    },
    /// Run the effects listed in the instance or the config
    Auto {
        #[command(flatten)]
        target: Target,

        /// Parameter overrides as JSON text, e.g. '{"effects": ["Dotter"]}'
        #[arg(long)]
        config: Option<String>,

        /// Parameter overrides read from a JSON file
        #[arg(long, conflicts_with = "config")]
        config_file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct Target {
    /// Input UFO path
    input: PathBuf,

    /// Instance whose stored parameters and effects to use
    instance: Option<String>,

    /// Output UFO path (default: <input stem>-<command>.ufo next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct DotArgs {
    /// Dot diameter in font units
    #[arg(long)]
    dot_size: Option<f64>,

    /// Preferred gap between dots in font units
    #[arg(long)]
    dot_spacing: Option<f64>,

    /// How far spacing may flex to fit a contour evenly, in percent
    #[arg(long)]
    flex_percent: Option<f64>,

    /// Keep dots even where they overlap each other
    #[arg(long)]
    no_prevent_overlaps: bool,

    /// Put a dot wherever two contours cross
    #[arg(long)]
    split_paths: bool,

    /// Draw dots as circles instead of `_dot` components
    #[arg(long)]
    preview: bool,
}

#[derive(Args)]
struct StrokeArgs {
    /// Nib width in font units
    #[arg(long)]
    width: Option<f64>,

    /// Nib height in font units (defaults to the width)
    #[arg(long)]
    height: Option<f64>,

    /// Nib angle in degrees
    #[arg(long, allow_hyphen_values = true)]
    angle: Option<f64>,

    /// Cap at the start of open contours (round, square, circle)
    #[arg(long, value_parser = parse_cap)]
    start_cap: Option<Cap>,

    /// Cap at the end of open contours (round, square, circle)
    #[arg(long, value_parser = parse_cap)]
    end_cap: Option<Cap>,

    /// Join between segments (round, bevel, mitre, circle)
    #[arg(long, value_parser = parse_join)]
    join_type: Option<Join>,

    /// Keep only the outer side of closed contours
    #[arg(long)]
    remove_internal: bool,

    /// Keep only the inner side of closed contours
    #[arg(long)]
    remove_external: bool,

    /// Stroke each segment on its own
    #[arg(long)]
    segmentwise: bool,
}

impl DotArgs {
    fn overrides(&self) -> Map<String, Value> {
        let mut map = Map::new();
        insert_opt(&mut map, "dotSize", self.dot_size);
        insert_opt(&mut map, "dotSpacing", self.dot_spacing);
        insert_opt(&mut map, "flexPercent", self.flex_percent);
        if self.no_prevent_overlaps {
            map.insert("preventOverlaps".into(), false.into());
        }
        if self.split_paths {
            map.insert("splitPaths".into(), true.into());
        }
        map
    }
}

impl StrokeArgs {
    fn overrides(&self) -> Map<String, Value> {
        let mut map = Map::new();
        insert_opt(&mut map, "strokerWidth", self.width);
        insert_opt(&mut map, "strokerHeight", self.height);
        insert_opt(&mut map, "strokerAngle", self.angle);
        insert_opt(&mut map, "startCap", self.start_cap.map(String::from));
        insert_opt(&mut map, "endCap", self.end_cap.map(String::from));
        insert_opt(&mut map, "joinType", self.join_type.map(String::from));
        for (key, set) in [
            ("removeInternal", self.remove_internal),
            ("removeExternal", self.remove_external),
            ("segmentWise", self.segmentwise),
        ] {
            if set {
                map.insert(key.into(), true.into());
            }
        }
        map
    }
}

fn parse_cap(s: &str) -> Result<Cap, String> {
    s.parse().map_err(|e: glyphdot::EffectError| e.to_string())
}

fn parse_join(s: &str) -> Result<Join, String> {
    s.parse().map_err(|e: glyphdot::EffectError| e.to_string())
}

fn insert_opt<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(v) = value {
        map.insert(key.to_string(), v.into());
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_output(input: &Path, command: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "font".to_string());
    input.with_file_name(format!("{stem}-{command}.ufo"))
}

fn read_config(text: Option<&str>, file: Option<&Path>) -> anyhow::Result<Map<String, Value>> {
    let text = match (text, file) {
        (Some(t), _) => t.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        (None, None) => return Ok(Map::new()),
    };
    let value: Value = serde_json::from_str(&text).context("parsing JSON config")?;
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("config must be a JSON object, got {other}"),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();

    let (name, target, caller, preview) = match &cli.command {
        Command::Dot { target, dots } => ("dot", target, dots.overrides(), dots.preview),
        Command::Stroke { target, stroke } => ("stroke", target, stroke.overrides(), false),
        Command::Auto {
            target,
            config,
            config_file,
        } => {
            let caller = read_config(config.as_deref(), config_file.as_deref())?;
            let preview = caller.get("preview").and_then(Value::as_bool).unwrap_or(false);
            ("auto", target, caller, preview)
        }
    };

    eprintln!();
    eprintln!("  glyphdot \u{00b7} {name}");
    eprintln!();

    let t_start = Instant::now();
    let mut font = norad::Font::load(&target.input)
        .with_context(|| format!("loading {}", target.input.display()))?;
    eprintln!(
        "  Load        {} \u{00b7} {} glyphs",
        target.input.display(),
        font.default_layer().len()
    );

    let instance: Option<Instance> = match &target.instance {
        Some(wanted) => match find_instance(&font, wanted)? {
            Some(found) => Some(found),
            None => {
                eprintln!("  \u{2717} no instance named {wanted:?} in {}", target.input.display());
                return Ok(ExitCode::FAILURE);
            }
        },
        None => None,
    };
    if let Some(instance) = &instance {
        eprintln!("  Instance    {}", instance.name);
    }

    let effects = match &cli.command {
        Command::Dot { .. } => vec![Effect::Dotter],
        Command::Stroke { .. } => vec![Effect::Stroker],
        Command::Auto { .. } => {
            if instance.is_none() && caller.is_empty() {
                eprintln!("  \u{2717} auto needs an instance or a config");
                return Ok(ExitCode::FAILURE);
            }
            effects_for(&caller, instance.as_ref())?
        }
    };
    if effects.is_empty() {
        eprintln!("  Nothing to do: no effects configured");
        eprintln!();
        return Ok(ExitCode::SUCCESS);
    }

    let params = ParamLayers {
        layer: Map::new(),
        instance: instance.as_ref().map(|i| i.params.clone()).unwrap_or_default(),
        caller: caller.clone(),
    };
    let described: Vec<String> = effects.iter().map(|e| e.describe(&params)).collect();
    eprintln!("  Effects     {}", described.join(" \u{2192} "));

    let engine = KurboStroker::default();
    let options = TransformOptions {
        instance: instance.as_ref(),
        caller,
        preview,
        engine: &engine,
    };
    let report = transform_font(&mut font, &effects, &options)?;
    eprintln!(
        "  Transform   {} glyphs \u{00b7} {} unchanged \u{00b7} {} failed  ({}ms)",
        report.transformed,
        report.unchanged,
        report.failures.len(),
        t_start.elapsed().as_millis(),
    );
    for (glyph, err) in &report.failures {
        eprintln!("    {glyph}: {err}");
    }

    let output = target
        .output
        .clone()
        .unwrap_or_else(|| default_output(&target.input, name));
    font.save(&output)
        .with_context(|| format!("saving {}", output.display()))?;

    eprintln!();
    eprintln!("  \u{2713} {}", output.display());
    eprintln!();

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_next_to_the_input() {
        assert_eq!(
            default_output(Path::new("fonts/Sans.ufo"), "dot"),
            PathBuf::from("fonts/Sans-dot.ufo")
        );
    }

    #[test]
    fn flags_become_caller_overrides() {
        let cli = Cli::parse_from([
            "glyphdot", "stroke", "in.ufo", "--width", "30", "--start-cap", "square", "--segmentwise",
        ]);
        let Command::Stroke { stroke, target } = cli.command else {
            panic!("expected stroke");
        };
        assert_eq!(target.instance, None);
        let map = stroke.overrides();
        assert_eq!(map.get("strokerWidth"), Some(&Value::from(30.0)));
        assert_eq!(map.get("startCap"), Some(&Value::from("square")));
        assert_eq!(map.get("segmentWise"), Some(&Value::from(true)));
        assert!(!map.contains_key("endCap"));
    }

    #[test]
    fn unknown_cap_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["glyphdot", "stroke", "in.ufo", "--end-cap", "pointy"]).is_err());
    }

    #[test]
    fn config_must_be_an_object() {
        let map = read_config(Some(r#"{"effects": "Dotter", "dotSize": 8}"#), None).expect("object");
        assert_eq!(map.get("dotSize"), Some(&Value::from(8)));
        assert!(read_config(Some("[1, 2]"), None).is_err());
        assert!(read_config(None, None).expect("empty").is_empty());
    }
}
