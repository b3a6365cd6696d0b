/*
 * CLI driver for the packing engine. Wires the concrete collaborators
 * together and runs one explicit scan → resolve → compute → assemble pass;
 * all scheduling policy lives here, the core exposes no reactive triggers.
 */
use clap::Parser;
use context_packer::core::{
    AssembleOptions, ConfigManagerOperations, CoreAssembler, CoreConfigManager, CoreFileSystem,
    CoreProfileManager, CoreTokenCounterProvider, CoreVisibilityResolver, CostEngine,
    DEFAULT_TOKEN_MODEL, DiagnosticsLog, PackSession, ProfileManagerOperations,
};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const APP_NAME: &str = "ContextPacker";

#[derive(Parser, Debug)]
#[command(
    name = "context_packer",
    about = "Packs a folder's text files into a single Markdown document"
)]
struct CliArgs {
    /// Root folder to pack.
    root: PathBuf,

    /// Exclude pattern, gitignore-style (repeatable).
    #[arg(short = 'e', long = "exclude")]
    exclude: Vec<String>,

    /// Include pattern (repeatable); when any are present, only matching
    /// files are packed.
    #[arg(short = 'i', long = "include")]
    include: Vec<String>,

    /// File containing a newline-separated exclude pattern block.
    #[arg(long)]
    exclude_file: Option<PathBuf>,

    /// File containing a newline-separated include pattern block.
    #[arg(long)]
    include_file: Option<PathBuf>,

    /// Token model identifier: cl100k_base, o200k_base or whitespace.
    #[arg(long)]
    model: Option<String>,

    /// Load patterns and model from a saved profile of this root.
    #[arg(long)]
    profile: Option<String>,

    /// Save the resulting configuration (and token cache) as a profile.
    #[arg(long)]
    save_profile: Option<String>,

    /// Omit the structure outline from the document.
    #[arg(long)]
    no_structure: bool,

    /// Skip token counting.
    #[arg(long)]
    no_tokens: bool,

    /// Write the document to this file instead of stdout.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn run(args: CliArgs) -> Result<(), String> {
    let fs_ops = CoreFileSystem::new();
    let resolver = CoreVisibilityResolver::new();
    let diagnostics = DiagnosticsLog::new();
    let profile_manager = CoreProfileManager::new();

    let mut session = PackSession::new();

    let mut exclude_block = String::new();
    let mut include_block = String::new();
    let mut seed_details = None;

    if let Some(profile_name) = &args.profile {
        let profile = profile_manager
            .load_profile(&args.root, profile_name)
            .map_err(|e| format!("Could not load profile '{profile_name}': {e}"))?;
        session.set_profile_name(Some(profile.name.clone()));
        session.set_token_model(profile.token_model.clone());
        exclude_block.push_str(&profile.exclude_patterns.join("\n"));
        exclude_block.push('\n');
        include_block.push_str(&profile.include_patterns.join("\n"));
        include_block.push('\n');
        seed_details = Some(profile.file_details);
    }

    append_pattern_block(&mut exclude_block, &args.exclude, args.exclude_file.as_deref())?;
    append_pattern_block(&mut include_block, &args.include, args.include_file.as_deref())?;

    // Explicit --model wins over the profile's stored model.
    if let Some(model) = &args.model {
        session.set_token_model(model.clone());
    } else if args.profile.is_none() {
        session.set_token_model(DEFAULT_TOKEN_MODEL.to_string());
    }

    session.apply_patterns(&resolver, &exclude_block, &include_block);
    session
        .load_root(&fs_ops, &resolver, &args.root, &diagnostics)
        .map_err(|e| format!("Could not scan {:?}: {e}", args.root))?;

    if let Some(details) = &seed_details {
        session.seed_costs_from_details(details);
    }

    if !args.no_tokens {
        let engine = CostEngine::new();
        let provider = CoreTokenCounterProvider::new();
        session
            .compute_costs(&engine, &provider, &fs_ops, &diagnostics)
            .map_err(|e| e.to_string())?;
        log::info!(
            "Total tokens across visible files: {}",
            session.total_token_count()
        );
    }

    let options = AssembleOptions {
        include_structure: !args.no_structure,
    };
    let document = session
        .assemble_document(&CoreAssembler::new(), &fs_ops, &options, &diagnostics)
        .ok_or_else(|| "No tree loaded; nothing to assemble".to_string())?;

    match &args.output {
        Some(path) => {
            fs::write(path, &document)
                .map_err(|e| format!("Failed to write document to {path:?}: {e}"))?;
            log::info!("Document written to {path:?}");
        }
        None => {
            io::stdout()
                .write_all(document.as_bytes())
                .map_err(|e| format!("Failed to write document to stdout: {e}"))?;
        }
    }

    if let Some(profile_name) = &args.save_profile {
        if let Some(snapshot) = session.create_profile_snapshot(profile_name) {
            profile_manager
                .save_profile(&args.root, &snapshot)
                .map_err(|e| format!("Could not save profile '{profile_name}': {e}"))?;
            let _ = profile_manager.save_last_profile_name(&args.root, profile_name);
            log::info!("Saved profile '{profile_name}'");
        }
    }

    let config_manager = CoreConfigManager::new();
    if let Err(e) = config_manager.record_recent_root(APP_NAME, &args.root) {
        log::warn!("Could not record recent root: {e}");
    }

    let diagnostic_count = diagnostics.len();
    if diagnostic_count > 0 {
        log::warn!("{diagnostic_count} diagnostics were recorded during this run");
    }
    Ok(())
}

fn append_pattern_block(
    block: &mut String,
    inline_patterns: &[String],
    pattern_file: Option<&Path>,
) -> Result<(), String> {
    if let Some(path) = pattern_file {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Could not read pattern file {path:?}: {e}"))?;
        block.push_str(&contents);
        block.push('\n');
    }
    for pattern in inline_patterns {
        block.push_str(pattern);
        block.push('\n');
    }
    Ok(())
}
