//! worldport CLI - port level packages and inspect package files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use worldport::donor::DonorIndex;
use worldport::model::{Attributes, Container, Reference};
use worldport::package::{BinaryPackageIo, PackageIo};
use worldport::port::{FileStatus, PortConfig, Porter};

#[derive(Parser, Debug)]
#[command(name = "worldport")]
#[command(about = "Port level packages between format generations")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("WORLDPORT_BUILD_DATE"), ")"))]
struct Cli {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Port every level set described by a config file
    Port {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show a package summary
    Info { file: PathBuf },
    /// Show a package's object hierarchy
    Tree { file: PathBuf },
    /// Build a donor index from a directory of packages
    Index {
        #[arg(long)]
        donors: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Package registered as non-indexed helper content
        #[arg(long, default_value = "VTestHelper")]
        helper: String,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("worldport={level}")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Port { config } => cmd_port(&config),
        Command::Info { file } => cmd_info(&file),
        Command::Tree { file } => cmd_tree(&file),
        Command::Index { donors, out, helper } => cmd_index(&donors, &out, &helper),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_port(config: &Path) -> worldport::Result<ExitCode> {
    let config = PortConfig::load(config)?;
    let io = BinaryPackageIo::default();
    let porter = Porter::new(config, &io)?;
    let report = porter.run()?;

    for file in &report.files {
        match &file.status {
            FileStatus::Ported => println!(
                "ported  {} -> {} ({} cloned, {} skipped, {} warnings)",
                file.source.display(),
                file.output.as_deref().map(Path::display).map(|d| d.to_string()).unwrap_or_default(),
                file.cloned,
                file.skipped,
                file.diagnostics.len()
            ),
            FileStatus::Failed(reason) => println!("FAILED  {}: {reason}", file.source.display()),
        }
    }

    let missing = report.missing_donors();
    if !missing.is_empty() {
        println!();
        println!("Objects with no donor ({}):", missing.len());
        for path in &missing {
            println!("  {path}");
        }
    }

    println!();
    println!(
        "{} ported, {} failed; donors opened {}, cache hits {}, evicted {}",
        report.ported(),
        report.failed(),
        report.cache.opened,
        report.cache.hits,
        report.cache.evicted
    );
    Ok(if report.failed() == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn open(file: &Path) -> worldport::Result<Container> {
    tracing::info!("Opening package: {}", file.display());
    BinaryPackageIo::default().open(file)
}

fn cmd_info(file: &Path) -> worldport::Result<ExitCode> {
    let c = open(file)?;

    println!("Package: {}", file.display());
    println!("Format:  {}", c.format());
    println!("Imports: {}", c.import_count());
    println!("Exports: {}", c.export_count());
    println!();

    let mut classes: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, e) in c.exports() {
        *classes.entry(e.class.as_str()).or_default() += 1;
    }
    println!("Classes:");
    for (class, count) in &classes {
        println!("  {class:<32} {count}");
    }

    if let Some(level) = c.persistent_level() {
        let actors = c.get(level)?.payload()?.as_level().map(|l| l.actors.clone()).unwrap_or_default();
        println!();
        println!("Level members: {}", actors.iter().filter(|r| !r.is_null()).count());
    }
    for (r, e) in c.exports() {
        if let Some(list) = e.attributes.object_array(Attributes::STREAMING_LEVELS) {
            println!("Streaming levels on {}:", c.path_of(r)?);
            for m in list {
                let name = c.entry(*m).and_then(|e| e.attributes.name(Attributes::PACKAGE_NAME)).unwrap_or("?");
                println!("  {m} {name}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_tree(file: &Path) -> worldport::Result<ExitCode> {
    let c = open(file)?;
    println!("Package: {}", file.display());
    println!();
    for (r, e) in c.exports() {
        if e.parent().is_none() {
            print_tree(&c, r, 0);
        }
    }
    if c.import_count() > 0 {
        println!();
        println!("Imports:");
        for (i, import) in c.imports().iter().enumerate() {
            println!("  {} {} [{}]", Reference::import(i), import.path, import.class);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_tree(c: &Container, r: Reference, depth: usize) {
    let Some(e) = c.entry(r) else { return };
    println!("{}{} {} [{}]", "  ".repeat(depth), r, e.name, e.class);
    for child in c.children_of(r) {
        print_tree(c, child, depth + 1);
    }
}

fn cmd_index(donors: &Path, out: &Path, helper: &str) -> worldport::Result<ExitCode> {
    let io = BinaryPackageIo::default();
    let mut index = DonorIndex::new();
    let scan = index.scan_dir(donors, &io, helper)?;
    index.save(out)?;
    println!(
        "Indexed {} objects from {} packages ({} failed) -> {}",
        index.len(),
        scan.indexed,
        scan.failed.len(),
        out.display()
    );
    Ok(ExitCode::SUCCESS)
}
