use std::fs;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use serde_json::{json, Value};
use vigil_diff::{diff_digests, save_diff_index_list};
use vigil_digest::DigestStore;
use vigil_pipeline::{Config, LocalFiles, Pipeline, RunReport};
use vigil_track::{MetricBlock, TrackStore};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Digest(args) => cmd_digest(args, format),
        Command::Diff(args) => cmd_diff(args, format),
        Command::Track(args) => cmd_track(args, format),
        Command::SaveTracks(args) => cmd_save_tracks(args, format),
        Command::Run(args) => cmd_run(args, format),
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_digest(args: DigestArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = DigestStore::new(args.suffix);
    if args.force && store.invalidate(&args.file)? {
        println!("{} discarded cached digest", "•".dimmed());
    }
    let cached = store.is_cached(&args.file);
    let digest = store
        .digest(&args.file)
        .with_context(|| format!("digesting {}", args.file.display()))?;
    let sidecar = store.sha_filename(&args.file);

    match format {
        OutputFormat::Json => print_json(&json!({
            "file": args.file,
            "sidecar": sidecar,
            "cached": cached,
            "lines": digest.line_count(),
            "distinct": digest.index.len(),
        })),
        OutputFormat::Text => {
            let source = if cached { "cached" } else { "computed" };
            println!(
                "{} {} ({source})",
                "✓".green().bold(),
                args.file.display().to_string().bold()
            );
            println!("  Lines:    {}", digest.line_count());
            println!("  Distinct: {}", digest.index.len());
            println!("  Sidecar:  {}", sidecar.display().to_string().cyan());
            Ok(())
        }
    }
}

fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = DigestStore::new(args.suffix);
    let old = store.digest_or_empty(&args.previous);
    let new = store
        .digest(&args.next)
        .with_context(|| format!("digesting {}", args.next.display()))?;
    let diff = diff_digests(&old, &new)?;
    save_diff_index_list(&diff.records, &args.output)?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "previous": args.previous,
            "next": args.next,
            "output": args.output,
            "lines": diff.line_numbers(),
        })),
        OutputFormat::Text => {
            if diff.is_empty() {
                println!("No new lines.");
            } else {
                println!(
                    "{} {} new line(s) in {}",
                    "✓".green().bold(),
                    diff.len().to_string().bold(),
                    args.next.display()
                );
                for record in diff.iter() {
                    println!("  {:>6}  {}", record.line_number.to_string().yellow(), record.text);
                }
            }
            println!("  Index: {}", args.output.display().to_string().cyan());
            Ok(())
        }
    }
}

/// Integer first, then float, otherwise the text itself.
fn parse_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return json!(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => json!(f),
        _ => json!(raw),
    }
}

fn cmd_track(args: TrackArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = TrackStore::new(".");
    let value = parse_value(&args.value);
    store.upsert(
        &args.file,
        &args.category,
        &args.key,
        &args.date,
        value.clone(),
        args.history,
    )?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "file": args.file,
            "category": args.category,
            "key": args.key,
            "date": args.date,
            "value": value,
            "history": args.history,
        })),
        OutputFormat::Text => {
            println!(
                "{} {}.{} = {} @ {}",
                "✓".green().bold(),
                args.category.bold(),
                args.key.bold(),
                value.to_string().yellow(),
                args.date
            );
            Ok(())
        }
    }
}

fn cmd_save_tracks(args: SaveTracksArgs, format: OutputFormat) -> anyhow::Result<()> {
    let raw = fs::read_to_string(&args.blocks)
        .with_context(|| format!("reading {}", args.blocks.display()))?;
    let blocks: Vec<MetricBlock> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing metric blocks in {}", args.blocks.display()))?;

    let store = TrackStore::new(args.storage);
    let saved = store.save_tracks(&args.date, &blocks)?;

    match format {
        OutputFormat::Json => print_json(&saved),
        OutputFormat::Text => {
            if saved.is_empty() {
                println!("No block names an output; nothing saved.");
            }
            for path in &saved {
                println!("  {} {}", "saved:".green(), path.display());
            }
            Ok(())
        }
    }
}

fn batch_name(args: &RunArgs) -> anyhow::Result<String> {
    if let Some(name) = &args.name {
        return Ok(name.clone());
    }
    args.files
        .first()
        .and_then(|f| f.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .context("no batch name given and no file to take it from")
}

fn cmd_run(args: RunArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config_path = Config::locate(&args.config);
    let config = Config::load(&config_path)?;
    let name = batch_name(&args)?;

    let mut pipeline = Pipeline::new(config);
    let report = pipeline.run(&LocalFiles::new(name, args.files))?;
    if report.changed_state() {
        pipeline.into_config().save(&config_path)?;
    }

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print_run_report(&report, &config_path);
            Ok(())
        }
    }
}

fn print_run_report(report: &RunReport, config_path: &Path) {
    let Some(batch) = &report.batch else {
        println!("No data available.");
        return;
    };
    if report.up_to_date {
        println!("{} {} is not newer than the last check", "•".dimmed(), batch.bold());
        return;
    }

    println!(
        "{} Processed {} ({})",
        "✓".green().bold(),
        batch.bold(),
        report.date.as_deref().unwrap_or("-")
    );
    for file in &report.files {
        println!(
            "  {} {}: {} line(s), {} new",
            file.category.cyan(),
            file.path.display(),
            file.line_count,
            file.changed_lines.to_string().yellow()
        );
    }
    for path in &report.skipped {
        println!("  {} {}", "skipped:".yellow(), path.display());
    }
    for path in report.written() {
        println!("  {} {}", "wrote:".green(), path.display());
    }
    println!("  Config: {}", config_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_value_prefers_int_then_float() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("-3"), json!(-3));
        assert_eq!(parse_value("2.5"), json!(2.5));
        assert_eq!(parse_value("abc"), json!("abc"));
        assert_eq!(parse_value("NaN"), json!("NaN"));
    }

    #[test]
    fn batch_name_defaults_to_first_file() {
        let args = RunArgs {
            config: PathBuf::from("vigil.toml"),
            name: None,
            files: vec![PathBuf::from("/d/Cat_201807300827.txt")],
        };
        assert_eq!(batch_name(&args).unwrap(), "Cat_201807300827.txt");

        let named = RunArgs {
            name: Some("Batch_201808011050.zip".into()),
            ..args
        };
        assert_eq!(batch_name(&named).unwrap(), "Batch_201808011050.zip");
    }

    #[test]
    fn run_saves_advanced_config() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Cat_201807300827.txt");
        fs::write(&data, "a\nb\n").unwrap();
        let config_path = dir.path().join("vigil.toml");
        let mut config = Config::new(dir.path());
        config.tracks.insert("Cat".into(), Default::default());
        config.save(&config_path).unwrap();

        cmd_run(
            RunArgs {
                config: config_path.clone(),
                name: None,
                files: vec![data.clone()],
            },
            OutputFormat::Json,
        )
        .unwrap();

        let saved = Config::load(&config_path).unwrap();
        assert_eq!(saved.local.last_check.as_deref(), Some("201807300827"));
        assert_eq!(saved.local.previous.get("Cat"), Some(&data));
    }
}
