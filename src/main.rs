//! csvremap CLI - remap CSV columns through transformation templates
//!
//! # Commands
//!
//! ```bash
//! csvremap apply input.csv -t template.json      # Transform a CSV
//! csvremap apply input.csv -t t1.json -t t2.json # Cascade two templates
//! csvremap parse input.csv                       # Just parse CSV to JSON
//! csvremap operations                            # Show pipeline operations
//! csvremap example-template                      # Show an example template
//! ```

use clap::{Parser, Subcommand};
use csvremap::{example_template, operations_description, read_path, Remapper, Template};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "csvremap")]
#[command(about = "Remap CSV columns through declarative transformation templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV file and output its records as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply one or more templates: CSV -> template(s) -> CSV
    Apply {
        /// Input CSV file
        input: PathBuf,

        /// Template JSON file; repeat to cascade transforms in order
        #[arg(short, long = "template", required = true)]
        templates: Vec<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show available pipeline operations
    Operations,

    /// Show an example transformation template
    ExampleTemplate,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),
        Commands::Apply {
            input,
            templates,
            output,
        } => cmd_apply(&input, &templates, output.as_deref()),
        Commands::Operations => cmd_operations(),
        Commands::ExampleTemplate => cmd_example_template(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing CSV: {}", input.display());

    let parsed = read_path(input)?;
    eprintln!("   Encoding: {}", parsed.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(parsed.delimiter));
    eprintln!("   Columns: {}", parsed.dataset.columns().join(", "));
    eprintln!("Parsed {} records", parsed.dataset.len());

    let records: Vec<serde_json::Map<String, serde_json::Value>> = (0..parsed.dataset.len())
        .map(|i| parsed.dataset.row_map(i))
        .collect();
    let json = serde_json::to_string_pretty(&records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_apply(
    input: &Path,
    templates: &[PathBuf],
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Processing: {}", input.display());

    let mut remapper = Remapper::new();
    let loaded = remapper.load_data(input)?;
    eprintln!("   Rows: {}", loaded.len());
    eprintln!("   Columns: {}", loaded.columns().join(", "));

    for (i, path) in templates.iter().enumerate() {
        let cascade = i > 0;
        let label = if cascade { " (cascade)" } else { "" };
        eprintln!("Applying template{}: {}", label, path.display());

        let template = Template::from_path(path)?;
        let result = remapper.apply(&template, cascade)?;
        eprintln!("   -> {} rows, columns: {}", result.len(), result.columns().join(", "));
    }

    match output {
        Some(path) => {
            remapper.save_data(path)?;
            eprintln!("Output written to: {}", path.display());
        }
        None => print!("{}", remapper.output()?),
    }

    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", operations_description());
    Ok(())
}

fn cmd_example_template() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(example_template().raw())?);
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
