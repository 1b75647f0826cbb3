use std::path::PathBuf;

use clap::{Parser, Subcommand};
use renderer::Antialiasing;

#[derive(Parser, Debug)]
#[command(
    name = "discglow",
    author,
    version,
    about = "Three glowing gradient discs on a shared axis",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// JSON configuration imported at start-up (and re-imported with `i`).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory receiving PNG captures and exported configurations.
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Window or snapshot size in physical pixels (e.g. `1280x720`).
    #[arg(long, global = true, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Frame-rate cap for the preview window (0 = uncapped).
    #[arg(long, global = true, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(
        long,
        global = true,
        value_name = "MODE",
        value_parser = parse_antialias,
        default_value = "auto"
    )]
    pub antialias: Antialiasing,

    /// Hold the animation clock at this many seconds instead of animating.
    #[arg(long, global = true, value_name = "SECONDS", value_parser = parse_time)]
    pub time: Option<f32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the interactive preview window (the default).
    Window,
    /// Render one frame headlessly and write it as a PNG.
    Snapshot,
    /// Export or validate JSON disc configurations.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write the current configuration (defaults plus `--config`) as JSON.
    Export,
    /// Parse a configuration file and report which fields would apply.
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" | "0" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;

            if samples == 1 {
                return Ok(Antialiasing::Off);
            }

            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }

            Ok(Antialiasing::Samples(samples))
        }
    }
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("size must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_time(value: &str) -> Result<f32, String> {
    let seconds = value
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid time '{}'; expected seconds", value.trim()))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err("time must be a non-negative number of seconds".into());
    }
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_antialias_modes() {
        assert_eq!(parse_antialias("auto").unwrap(), Antialiasing::Auto);
        assert_eq!(parse_antialias(" OFF ").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("1").unwrap(), Antialiasing::Off);
        assert_eq!(parse_antialias("4").unwrap(), Antialiasing::Samples(4));
        assert!(parse_antialias("3").is_err());
        assert!(parse_antialias("lots").is_err());
        assert!(parse_antialias("").is_err());
    }

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_size("64X36").unwrap(), (64, 36));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("widexhigh").is_err());
    }

    #[test]
    fn parses_times() {
        assert_eq!(parse_time("2.5").unwrap(), 2.5);
        assert!(parse_time("-1").is_err());
        assert!(parse_time("soon").is_err());
        assert!(parse_time("inf").is_err());
    }

    #[test]
    fn global_flags_reach_subcommands() {
        let cli = Cli::try_parse_from(["discglow", "snapshot", "--size", "64x36", "--time", "1"])
            .unwrap();
        assert!(matches!(cli.command, Some(Command::Snapshot)));
        assert_eq!(cli.run.size, Some((64, 36)));
        assert_eq!(cli.run.time, Some(1.0));
        assert_eq!(cli.run.antialias, Antialiasing::Auto);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
