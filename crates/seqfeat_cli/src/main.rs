//! Command-line loader for feature documents.
//!
//! # Usage
//! `seqfeat_cli <db-path> <feature.json> [--normalize] [--log-dir <abs-dir>]`
//!
//! Builds one feature node from a JSON options document, persists it in the
//! SQLite store at `<db-path>` and prints its label and child labels. With
//! `--normalize` the document's segments are stored as independent records
//! instead of being embedded.

use clap::Parser;
use log::info;
use seqfeat_core::{
    core_version, default_log_level, init_logging, FeatureNode, FeatureOptions, FeatureStore,
    SqliteFeatureStore, StoreOptions,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

#[derive(Parser, Debug)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
struct Cli {
    #[arg(help = "Path of the SQLite feature store (created when missing).")]
    db_path: PathBuf,
    #[arg(help = "Path of the JSON feature options document.")]
    document: PathBuf,
    #[arg(
        long,
        help = "Store the document's segments as independent records instead of embedding them."
    )]
    normalize: bool,
    #[arg(long, value_name = "DIR", help = "Absolute directory for log files.")]
    log_dir: Option<String>,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("seqfeat_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<(), String> {
    if let Some(log_dir) = &args.log_dir {
        init_logging(default_log_level(), log_dir)?;
    }

    let text = std::fs::read_to_string(&args.document)
        .map_err(|err| format!("cannot read `{}`: {err}", args.document.display()))?;
    let document: serde_json::Value =
        serde_json::from_str(&text).map_err(|err| format!("invalid JSON document: {err}"))?;
    let mut options = FeatureOptions::from_json(&document).map_err(|err| err.to_string())?;

    let store: Rc<dyn FeatureStore> = Rc::new(
        SqliteFeatureStore::open(&args.db_path, StoreOptions::default())
            .map_err(|err| err.to_string())?,
    );

    let segments = if args.normalize {
        std::mem::take(&mut options.segments)
    } else {
        Vec::new()
    };
    let mut node = FeatureNode::new(options, Some(&store)).map_err(|err| err.to_string())?;
    if !segments.is_empty() {
        node.add_seq_feature(segments).map_err(|err| err.to_string())?;
    }

    info!(
        "event=cli_load module=cli status=ok version={} normalize={} children={}",
        core_version(),
        args.normalize,
        node.children().len()
    );

    println!("{}", node.label());
    for child in node.get_seq_features(&[]).map_err(|err| err.to_string())? {
        println!("  {}", child.label());
    }
    Ok(())
}
