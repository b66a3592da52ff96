use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use nctemplate::codec::{DataObjectWriter, JsonWriter};
use nctemplate::{LoadError, TemplateRegistry};
use tracing_subscriber::EnvFilter;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "nctemplate")]
#[command(
    about = "Check data object templates and build data objects from them",
    long_about = None
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate templates and show what each one requires.
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Build a data object and write it as JSON.
    Build {
        /// Template file to load (repeatable).
        #[arg(long = "template", required = true)]
        templates: Vec<PathBuf>,

        /// Data object type to build.
        #[arg(long = "type")]
        data_object_type: String,

        /// Dimension length as NAME=LEN (repeatable).
        #[arg(long = "dim", value_parser = parse_dimension)]
        dimensions: Vec<(String, usize)>,

        /// Substitution value as KEY=VALUE (repeatable).
        #[arg(long = "sub", value_parser = parse_substitution)]
        substitutions: Vec<(String, String)>,

        /// Mirror missing_value as _FillValue where none is declared.
        #[arg(long)]
        fill_value: bool,

        /// Output file (stdout if omitted).
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

fn parse_substitution(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", arg)),
    }
}

fn parse_dimension(arg: &str) -> std::result::Result<(String, usize), String> {
    let (name, length) = parse_substitution(arg)
        .map_err(|_| format!("expected NAME=LEN, got '{}'", arg))?;
    let length = length
        .parse()
        .map_err(|_| format!("dimension length '{}' is not a non-negative integer", length))?;
    Ok((name, length))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn check(files: &[PathBuf]) -> Result<()> {
    let mut registry = TemplateRegistry::new();
    let mut failures = 0;

    for path in files {
        match registry.load_file(path) {
            Ok(key) => {
                let Some(template) = registry.lookup(&key) else {
                    continue;
                };
                println!("ok {} [{}]", key, template.source_name());
                println!("  {}", template.requirements());
                for warning in template.warnings() {
                    println!("  warning: {}", warning);
                }
            }
            Err(LoadError::Invalid {
                source_name,
                errors,
            }) => {
                failures += 1;
                println!("failed [{}]", source_name);
                for error in errors {
                    println!("  {}", error);
                }
            }
            Err(e) => {
                failures += 1;
                println!("failed: {}", e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} template(s) failed", failures, files.len());
    }
    Ok(())
}

fn build(
    templates: &[PathBuf],
    data_object_type: &str,
    dimensions: Vec<(String, usize)>,
    substitutions: Vec<(String, String)>,
    fill_value: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut registry = TemplateRegistry::new();
    for path in templates {
        registry
            .load_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }

    let object = registry
        .builder(data_object_type)?
        .dimensions(dimensions)
        .substitutions(substitutions)
        .add_fill_value(fill_value)
        .build()?;

    let sink: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    JsonWriter::new(sink).pretty(true).write_data_object(&object)?;

    if let Some(path) = output {
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Commands::Check { files } => check(&files),
        Commands::Build {
            templates,
            data_object_type,
            dimensions,
            substitutions,
            fill_value,
            output,
        } => build(
            &templates,
            &data_object_type,
            dimensions,
            substitutions,
            fill_value,
            output,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(
            parse_dimension("level=5"),
            Ok(("level".to_string(), 5))
        );
        assert!(parse_dimension("level").is_err());
        assert!(parse_dimension("level=-1").is_err());
        assert_eq!(
            parse_substitution("title=a=b"),
            Ok(("title".to_string(), "a=b".to_string()))
        );
        assert_eq!(
            parse_substitution("site="),
            Ok(("site".to_string(), String::new()))
        );
        assert!(parse_substitution("=x").is_err());
    }

    #[test]
    fn test_build_command_line() {
        let cli = Cli::try_parse_from([
            "nctemplate",
            "build",
            "--template",
            "profile.yaml",
            "--type",
            "profile",
            "--dim",
            "level=5",
            "--sub",
            "site=Alpha",
            "--fill-value",
        ])
        .unwrap();
        match cli.cmd {
            Commands::Build {
                templates,
                data_object_type,
                dimensions,
                substitutions,
                fill_value,
                output,
            } => {
                assert_eq!(templates, vec![PathBuf::from("profile.yaml")]);
                assert_eq!(data_object_type, "profile");
                assert_eq!(dimensions, vec![("level".to_string(), 5)]);
                assert_eq!(substitutions, vec![("site".to_string(), "Alpha".to_string())]);
                assert!(fill_value);
                assert!(output.is_none());
            }
            Commands::Check { .. } => panic!("expected build"),
        }
    }
}
