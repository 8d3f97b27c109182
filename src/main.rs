use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use yaml_patcher::codec::{render_node, Format, Stream};
use yaml_patcher::path::{compile, find};
use yaml_patcher::processor::{FileReport, ProcessOptions, Processor};
use yaml_patcher::rules::{load_from_path, ConfigError, Rule};

#[derive(Parser)]
#[command(name = "yaml-patcher")]
#[command(about = "Rule-driven patching of YAML and JSON documents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a rule file to one document or a directory of documents
    Apply {
        /// Rule file (.toml, .yaml or .yml)
        #[arg(short, long)]
        config: PathBuf,

        /// Single document to patch in place
        #[arg(short, long, conflicts_with = "dir", required_unless_present = "dir")]
        input: Option<PathBuf>,

        /// Directory to patch recursively
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Mirror patched files into this directory instead of editing in place
        #[arg(short, long, requires = "dir")]
        output: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Keep a .bak copy of every file edited in place
        #[arg(short, long)]
        backup: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Load and validate a rule file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print the nodes a path resolves to
    Query {
        #[arg(short, long)]
        input: PathBuf,

        /// Path expression, e.g. spec.containers[name=nginx].image
        #[arg(short, long)]
        path: String,

        /// Print matches as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            config,
            input,
            dir,
            output,
            dry_run,
            backup,
            diff,
        } => cmd_apply(
            &config,
            input.as_deref(),
            dir.as_deref(),
            output.as_deref(),
            ProcessOptions { dry_run, backup },
            diff,
        ),

        Commands::Validate { config } => cmd_validate(&config),

        Commands::Query { input, path, json } => cmd_query(&input, &path, json),
    }
}

/// Helper: Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        println!("{}", hunk.header().to_string().cyan());
        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{}", change).red(),
                ChangeTag::Insert => format!("+{}", change).green(),
                ChangeTag::Equal => format!(" {}", change).normal(),
            };
            print!("{}", line);
            if change.missing_newline() {
                println!();
            }
        }
    }
}

fn describe_rule(rule: &Rule) -> String {
    let mut text = format!("{} {}", rule.action, rule.path);
    if rule.where_clause.is_some() {
        text.push_str(" (filtered)");
    }
    if rule.continue_on_not_found {
        text.push_str(" (optional)");
    }
    text
}

/// Totals printed in the final summary.
#[derive(Default)]
struct Tally {
    patched: usize,
    unchanged: usize,
    skipped_rules: usize,
    failed: usize,
}

fn report_file(report: &FileReport, dry_run: bool, show_diff: bool, tally: &mut Tally) {
    let applied = report.outcomes.len() - report.skipped();
    if report.changed() {
        let verb = if dry_run { "Would patch" } else { "Patched" };
        println!(
            "{} {}: {} ({} rule application(s))",
            "✓".green(),
            report.output.display(),
            verb,
            applied
        );
        if let Some(backup) = &report.backup {
            println!("  {}", format!("backup: {}", backup.display()).dimmed());
        }
        tally.patched += 1;
    } else {
        println!(
            "{} {}: Unchanged",
            "⊙".yellow(),
            report.output.display()
        );
        tally.unchanged += 1;
    }

    for outcome in report.outcomes.iter().filter(|o| o.is_skipped()) {
        println!("  {} {}", "⊘".cyan(), outcome);
        tally.skipped_rules += 1;
    }

    if show_diff && report.changed() {
        display_diff(&report.output, &report.original, &report.rendered);
    }
}

fn cmd_apply(
    config: &Path,
    input: Option<&Path>,
    dir: Option<&Path>,
    output: Option<&Path>,
    options: ProcessOptions,
    show_diff: bool,
) -> Result<()> {
    let processor = Processor::from_path(config)?;
    let rules = processor.rules();
    if rules.meta.name.is_empty() {
        println!("Loaded {} rule(s) from {}", rules.rules.len(), config.display());
    } else {
        println!(
            "Loaded {} rule(s) from {} ({})",
            rules.rules.len(),
            config.display(),
            rules.meta.name
        );
    }
    if options.dry_run {
        println!("{}", "[DRY RUN - no files will be written]".cyan());
    }
    println!();

    let mut tally = Tally::default();

    match (input, dir) {
        (Some(input), _) => match processor.process_file(input, None, options) {
            Ok(report) => report_file(&report, options.dry_run, show_diff, &mut tally),
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                tally.failed += 1;
            }
        },
        (None, Some(dir)) => {
            let batch = processor.process_directory(dir, output, options)?;
            for report in &batch.succeeded {
                report_file(report, options.dry_run, show_diff, &mut tally);
            }
            for (path, e) in &batch.failed {
                eprintln!("{} {}: {}", "✗".red(), path.display(), e);
                tally.failed += 1;
            }
        }
        (None, None) => anyhow::bail!("either --input or --dir is required"),
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} patched", format!("{}", tally.patched).green());
    println!("  {} unchanged", format!("{}", tally.unchanged).yellow());
    println!("  {} rule(s) skipped", format!("{}", tally.skipped_rules).cyan());
    println!("  {} failed", format!("{}", tally.failed).red());

    if tally.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_validate(config: &Path) -> Result<()> {
    match load_from_path(config) {
        Ok(rules) => {
            println!(
                "{} {}: {} rule(s) valid",
                "✓".green(),
                config.display(),
                rules.rules.len()
            );
            if let Some(description) = &rules.meta.description {
                println!("  {}", description.dimmed());
            }
            for (index, rule) in rules.rules.iter().enumerate() {
                println!("  {}. {}", index + 1, describe_rule(rule));
            }
            Ok(())
        }
        Err(ConfigError::Validation { source, .. }) => {
            eprintln!(
                "{} {}: {} problem(s)",
                "✗".red(),
                config.display(),
                source.issues.len()
            );
            for issue in &source.issues {
                eprintln!("  - {}", issue);
            }
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_query(input: &Path, expr: &str, json: bool) -> Result<()> {
    let address = compile(expr)?;
    let format = Format::from_path(input).unwrap_or(Format::Yaml);
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let stream = Stream::parse(&text, format)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    let out_format = if json { Format::Json } else { Format::Yaml };

    let mut failed = 0;
    for (index, tree) in stream.documents.iter().enumerate() {
        match find(tree, &address) {
            Ok(nodes) => {
                println!(
                    "{}",
                    format!("# document {}: {} match(es)", index + 1, nodes.len()).dimmed()
                );
                for node in nodes {
                    print!("{}", render_node(tree, node, out_format)?);
                }
            }
            Err(e) => {
                eprintln!("{} document {}: {}", "✗".red(), index + 1, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
