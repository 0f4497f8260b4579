use std::fs;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

mod service;

use service::{ServiceConfig, service_template};

#[derive(Parser)]
#[command(name = "vela")]
#[command(about = "Assemble the ECS service CloudFormation template", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the template and print it
    Synth {
        /// Emit compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,

        /// Write the document to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Assemble the template and report what it contains
    Validate,
    /// Diff a saved template against the generated one
    Diff {
        /// Path to a previously synthesized template
        file: PathBuf,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Synth { compact, output } => run_synth(compact, output.as_deref()),
        Commands::Validate => run_validate(),
        Commands::Diff { file } => run_diff(&file),
        Commands::Completions { shell } => run_completions(shell),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn render(compact: bool) -> Result<String, String> {
    let template = service_template(&ServiceConfig::default()).map_err(|e| e.to_string())?;
    let document = template.to_json();

    let rendered = if compact {
        serde_json::to_string(&document)
    } else {
        serde_json::to_string_pretty(&document)
    };
    rendered.map_err(|e| format!("Failed to serialize template: {}", e))
}

fn run_synth(compact: bool, output: Option<&Path>) -> Result<(), String> {
    let rendered = render(compact)?;

    match output {
        Some(path) => {
            fs::write(path, format!("{rendered}\n"))
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            println!("{} {}", "Wrote".green(), path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn run_validate() -> Result<(), String> {
    println!("{}", "Assembling...".cyan());

    let template = service_template(&ServiceConfig::default()).map_err(|e| e.to_string())?;

    println!(
        "{}",
        format!(
            "✓ {} parameters, {} conditions, {} resources assembled successfully.",
            template.parameters().count(),
            template.conditions().count(),
            template.resources().count()
        )
        .green()
        .bold()
    );

    for (name, resource) in template.resources() {
        println!("  • {} ({})", name, resource.resource_type());
    }

    Ok(())
}

fn run_diff(file: &Path) -> Result<(), String> {
    let generated = render(false)?;
    let saved = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;

    if saved.trim_end() == generated {
        println!("{}", "No drift. Saved template matches the generated one.".green());
        return Ok(());
    }

    println!("{} {}:", "Diff for".cyan().bold(), file.display());

    let diff = TextDiff::from_lines(saved.as_str(), generated.as_str());
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => " ".normal(),
        };
        print!("{}{}", sign, change);
    }

    Err(format!("{} differs from the generated template", file.display()))
}

fn run_completions(shell: Shell) -> Result<(), String> {
    clap_complete::generate(shell, &mut Cli::command(), "vela", &mut std::io::stdout());
    Ok(())
}
