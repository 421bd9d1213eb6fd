use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::*;

use wordlist::config::{StoreType, WordlistConfiguration};
use wordlist::{Result, Wordlist};

/// Import wordlist archives and check words against a local wordlist store.
#[derive(Parser, Debug)]
#[command(name = "wordlist_tool", version, about = "Wordlist store maintenance")]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Store directory, overrides `data_dir` from the configuration
    #[arg(long, short)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the stored list with a zip archive
    Import { archive: PathBuf },
    /// Check whether words are on the list
    Check {
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Run one inspection cycle against the configured sources
    Inspect,
    /// Print the stored status and health
    Status,
}

fn load_config(cli: &Cli) -> Result<WordlistConfiguration> {
    let mut config = match &cli.config {
        Some(path) => WordlistConfiguration::from_json_file(path)?,
        None => WordlistConfiguration::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if config.data_dir.is_none() {
        config.data_dir = Some(PathBuf::from("."));
    }
    config.store_type = StoreType::LocalDb;
    config.background_inspection = false;
    Ok(config)
}

fn run(cli: Cli) -> Result<bool> {
    let config = load_config(&cli)?;
    let wordlist = Wordlist::open_configured(config)?;
    let mut all_clear = true;

    match &cli.command {
        Command::Import { archive } => {
            let status = wordlist.populate(File::open(archive)?)?;
            println!(
                "imported {} values from {} lines in {}ms",
                status.value_count, status.lines_imported, status.import_ms
            );
        }
        Command::Check { words } => {
            for word in words {
                let found = wordlist.contains_word(word)?;
                all_clear &= !found;
                println!("{}\t{}", if found { "FOUND" } else { "ok" }, word);
            }
        }
        Command::Inspect => {
            let report = wordlist.inspect()?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "cleared": report.cleared,
                "imported": report.imported.map(|t| t.label()),
                "autoImportError": report.auto_import_error,
            }))?);
        }
        Command::Status => {
            let status = wordlist.read_wordlist_status()?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            for record in wordlist.health() {
                println!("{:?}\t{}", record.status, record.detail);
            }
        }
    }

    wordlist.close();
    Ok(all_clear)
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}
