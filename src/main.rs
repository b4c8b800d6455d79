use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use manifest_json::{
    parse_with_options, select_updates, serialize_with, update_summary, AccessError, Formatting,
    Manifest, PackageInfo, PackageUpdate, ParseOptions,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    disable_help_subcommand = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a JSON file and print it back out
    Format(FormatArgs),

    /// Set dependency versions in a package manifest
    Set(SetArgs),

    /// List registry packages that have a newer compatible version
    Outdated(OutdatedArgs),
}

#[derive(Args, Debug)]
struct FormatArgs {
    /// JSON file to read
    file: PathBuf,

    /// print on a single line
    #[arg(long, conflicts_with = "indent")]
    compact: bool,

    /// spaces per nesting level
    #[arg(long, value_name = "int", default_value_t = 2)]
    indent: usize,

    /// reject documents nested deeper than this
    #[arg(long, value_name = "int")]
    max_depth: Option<usize>,
}

#[derive(Args, Debug)]
struct SetArgs {
    /// manifest file, e.g. Packages/manifest.json
    manifest: PathBuf,

    /// NAME=VERSION pairs
    #[arg(required = true, value_parser = parse_assignment)]
    dependencies: Vec<(String, String)>,

    /// print the updated manifest instead of writing it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct OutdatedArgs {
    /// manifest file, e.g. Packages/manifest.json
    manifest: PathBuf,

    /// JSON array of installed packages (name, version, latestCompatible, source)
    #[arg(long, value_name = "file")]
    packages: PathBuf,

    /// write the selected updates to the manifest
    #[arg(long)]
    apply: bool,

    /// also apply preview updates that are offered but not selected
    #[arg(long)]
    include_preview: bool,
}

fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, version)) if !name.is_empty() && !version.is_empty() => {
            Ok((name.to_string(), version.to_string()))
        }
        _ => Err(format!("expected NAME=VERSION, got {arg:?}")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .format_timestamp(None)
        .init();

    run(cli, &mut io::stdout().lock())
}

fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    match cli.command {
        Commands::Format(arguments) => run_format(&arguments, out),
        Commands::Set(arguments) => run_set(&arguments, out),
        Commands::Outdated(arguments) => run_outdated(&arguments, out),
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_manifest(path: &Path) -> Result<Manifest> {
    Manifest::parse(&read(path)?).with_context(|| format!("invalid manifest {}", path.display()))
}

fn write_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    log::info!("writing {}", path.display());
    fs::write(path, format!("{}\n", manifest.to_json()))
        .with_context(|| format!("failed to write {}", path.display()))
}

fn run_format(arguments: &FormatArgs, out: &mut impl Write) -> Result<()> {
    let options = ParseOptions {
        max_depth: arguments.max_depth,
    };
    let formatting = if arguments.compact {
        Formatting::Compact
    } else {
        Formatting::Indented(arguments.indent)
    };

    let text = read(&arguments.file)?;
    let value = parse_with_options(&text, options)
        .with_context(|| format!("failed to parse {}", arguments.file.display()))?;
    writeln!(out, "{}", serialize_with(&value, formatting))?;
    Ok(())
}

fn run_set(arguments: &SetArgs, out: &mut impl Write) -> Result<()> {
    let mut manifest = read_manifest(&arguments.manifest)?;
    let dependencies = manifest
        .dependencies()
        .with_context(|| format!("no dependencies in {}", arguments.manifest.display()))?;

    let mut updates = Vec::with_capacity(arguments.dependencies.len());
    for (name, version) in &arguments.dependencies {
        let current_version = match dependencies.get::<str>(name) {
            Ok(current) => current.to_string(),
            Err(AccessError::MissingKey(_)) => String::from("(none)"),
            Err(error) => return Err(error).with_context(|| format!("dependency {name}")),
        };
        updates.push(PackageUpdate {
            name: name.clone(),
            current_version,
            new_version: version.clone(),
        });
    }

    manifest
        .apply(&updates)
        .with_context(|| format!("failed to update {}", arguments.manifest.display()))?;
    write!(out, "{}", update_summary(&updates))?;

    if arguments.dry_run {
        writeln!(out, "{}", manifest.to_json())?;
    } else {
        write_manifest(&arguments.manifest, &manifest)?;
    }
    Ok(())
}

fn run_outdated(arguments: &OutdatedArgs, out: &mut impl Write) -> Result<()> {
    let mut manifest = read_manifest(&arguments.manifest)?;
    let packages = PackageInfo::list_from_json(&read(&arguments.packages)?)
        .with_context(|| format!("invalid package list {}", arguments.packages.display()))?;

    let candidates = select_updates(&packages);
    if candidates.is_empty() {
        writeln!(out, "All packages are up to date")?;
        return Ok(());
    }

    for candidate in &candidates {
        let mark = if candidate.selected { 'x' } else { ' ' };
        writeln!(out, "[{mark}] {}", candidate.update)?;
    }

    if arguments.apply {
        let updates: Vec<PackageUpdate> = candidates
            .into_iter()
            .filter(|candidate| candidate.selected || arguments.include_preview)
            .map(|candidate| candidate.update)
            .collect();
        if updates.is_empty() {
            writeln!(out, "No updates selected")?;
            return Ok(());
        }
        manifest
            .apply(&updates)
            .with_context(|| format!("failed to update {}", arguments.manifest.display()))?;
        write!(out, "{}", update_summary(&updates))?;
        write_manifest(&arguments.manifest, &manifest)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
  "dependencies": {
    "com.unity.textmeshpro": "2.0.1",
    "com.unity.timeline": "1.2.6"
  }
}"#;

    pub fn run_command(arg_vec: Vec<&str>) -> Result<String> {
        let cli = Cli::try_parse_from(arg_vec)?;
        let mut output = Vec::new();
        run(cli, &mut output)?;
        Ok(String::from_utf8(output)?)
    }

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn help() {
        let err = run_command(vec!["manifest-json"]).unwrap_err().to_string();
        assert!(err.contains("Usage: manifest-json [OPTIONS] <COMMAND>"));
    }

    #[test]
    fn format_round_trips() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "doc.json", r#"{"b":[1,2.5],"a":null}"#);

        let output = run_command(vec!["manifest-json", "format", &file]).unwrap();
        assert_eq!(output, "{\n  \"b\": [\n    1,\n    2.5\n  ],\n  \"a\": null\n}\n");

        let output = run_command(vec!["manifest-json", "format", "--compact", &file]).unwrap();
        assert_eq!(output, "{\"b\":[1,2.5],\"a\":null}\n");
    }

    #[test]
    fn format_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "bad.json", r#"{"a": /* no */ 1}"#);
        let err = run_command(vec!["manifest-json", "format", &file]).unwrap_err();
        assert!(format!("{err:#}").contains("comment tokens are not supported"));
    }

    #[test]
    fn format_depth_limit() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "deep.json", "[[[[1]]]]");
        assert!(run_command(vec!["manifest-json", "format", "--max-depth", "3", &file]).is_err());
        assert!(run_command(vec!["manifest-json", "format", "--max-depth", "4", &file]).is_ok());
    }

    #[test]
    fn set_writes_manifest() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "manifest.json", MANIFEST);

        let output = run_command(vec![
            "manifest-json",
            "set",
            &file,
            "com.unity.timeline=1.2.10",
        ])
        .unwrap();
        assert_eq!(
            output,
            "Updating the following packages:\ncom.unity.timeline: 1.2.6 -> 1.2.10\n"
        );

        let written = fs::read_to_string(&file).unwrap();
        let manifest = Manifest::parse(&written).unwrap();
        assert_eq!(
            manifest.dependency_version("com.unity.timeline").unwrap(),
            "1.2.10"
        );
        assert_eq!(
            manifest.dependency_version("com.unity.textmeshpro").unwrap(),
            "2.0.1"
        );
    }

    #[test]
    fn set_dry_run_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "manifest.json", MANIFEST);

        let output = run_command(vec![
            "manifest-json",
            "set",
            "--dry-run",
            &file,
            "com.unity.ugui=1.0.0",
        ])
        .unwrap();
        assert!(output.contains("com.unity.ugui: (none) -> 1.0.0"));
        assert!(output.contains(r#""com.unity.ugui": "1.0.0""#));
        assert_eq!(fs::read_to_string(&file).unwrap(), MANIFEST);
    }

    #[test]
    fn set_needs_dependencies_object() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "manifest.json", r#"{"name": "app"}"#);

        let err = run_command(vec!["manifest-json", "set", &file, "a=1.0.0"]).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("no dependencies in"));
        assert!(message.contains(r#"no entry for key "dependencies""#));
        assert_eq!(fs::read_to_string(&file).unwrap(), r#"{"name": "app"}"#);
    }

    #[test]
    fn set_rejects_bad_assignment() {
        assert!(run_command(vec!["manifest-json", "set", "m.json", "nameonly"]).is_err());
    }

    #[test]
    fn outdated_lists_and_applies() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "manifest.json", MANIFEST);
        let packages = write_file(
            &dir,
            "packages.json",
            r#"[
                {"name": "com.unity.timeline", "version": "1.2.6", "latestCompatible": "1.2.10", "source": "registry"},
                {"name": "com.unity.textmeshpro", "version": "2.0.1", "latestCompatible": "2.0.1", "source": "registry"}
            ]"#,
        );

        let output = run_command(vec![
            "manifest-json",
            "outdated",
            &file,
            "--packages",
            &packages,
        ])
        .unwrap();
        assert_eq!(output, "[x] com.unity.timeline: 1.2.6 -> 1.2.10\n");
        assert_eq!(fs::read_to_string(&file).unwrap(), MANIFEST);

        run_command(vec![
            "manifest-json",
            "outdated",
            &file,
            "--packages",
            &packages,
            "--apply",
        ])
        .unwrap();
        let manifest = Manifest::parse(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(
            manifest.dependency_version("com.unity.timeline").unwrap(),
            "1.2.10"
        );
    }

    const PREVIEW_PACKAGES: &str = r#"[
        {"name": "com.unity.timeline", "version": "1.2.6", "latestCompatible": "1.2.10", "source": "registry"},
        {"name": "com.unity.textmeshpro", "version": "2.0.1-preview.1", "latestCompatible": "2.0.1-preview.4", "source": "registry"}
    ]"#;

    #[test]
    fn outdated_include_preview_applies_unselected() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "manifest.json", MANIFEST);
        let packages = write_file(&dir, "packages.json", PREVIEW_PACKAGES);

        let output = run_command(vec![
            "manifest-json",
            "outdated",
            &file,
            "--packages",
            &packages,
            "--apply",
            "--include-preview",
        ])
        .unwrap();
        assert!(output.contains("[ ] com.unity.textmeshpro: 2.0.1-preview.1 -> 2.0.1-preview.4\n"));
        assert!(output.ends_with(
            "Updating the following packages:\n\
             com.unity.timeline: 1.2.6 -> 1.2.10\n\
             com.unity.textmeshpro: 2.0.1-preview.1 -> 2.0.1-preview.4\n"
        ));

        let manifest = Manifest::parse(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(
            manifest.dependency_version("com.unity.textmeshpro").unwrap(),
            "2.0.1-preview.4"
        );
        assert_eq!(
            manifest.dependency_version("com.unity.timeline").unwrap(),
            "1.2.10"
        );
    }

    #[test]
    fn outdated_apply_without_selection_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "manifest.json", MANIFEST);
        let packages = write_file(
            &dir,
            "packages.json",
            r#"[{"name": "com.unity.textmeshpro", "version": "2.0.1-preview.1", "latestCompatible": "2.0.1-preview.4", "source": "registry"}]"#,
        );

        let output = run_command(vec![
            "manifest-json",
            "outdated",
            &file,
            "--packages",
            &packages,
            "--apply",
        ])
        .unwrap();
        assert_eq!(
            output,
            "[ ] com.unity.textmeshpro: 2.0.1-preview.1 -> 2.0.1-preview.4\nNo updates selected\n"
        );
        assert_eq!(fs::read_to_string(&file).unwrap(), MANIFEST);
    }

    #[test]
    fn outdated_up_to_date() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "manifest.json", MANIFEST);
        let packages = write_file(&dir, "packages.json", "[]");
        let output = run_command(vec![
            "manifest-json",
            "outdated",
            &file,
            "--packages",
            &packages,
        ])
        .unwrap();
        assert_eq!(output, "All packages are up to date\n");
    }
}
