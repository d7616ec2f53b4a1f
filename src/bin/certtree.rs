use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use certtree::cert::Certificate;
use certtree::config::{IssuanceConfig, ProvisionPlan};
use certtree::error::{CertTreeError, ErrorCategory, Result};
use certtree::provision::provision;
use certtree::role::Role;
use certtree::service::IssuanceService;
use certtree::store::DirectoryStore;

/// Issue and chain certificates of a root / sub-CA / leaf hierarchy.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding certificate records
    #[arg(short, long, default_value = "certs", global = true)]
    dir: PathBuf,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Issue a certificate, or return the stored one if it already exists
    Issue {
        subject: String,
        /// root, subca, server or client
        #[arg(short, long)]
        role: Role,
        /// Subject of the signing CA; omit for a root
        #[arg(short, long)]
        issuer: Option<String>,
    },
    /// Print the trust chain of a subject, nearest issuer first
    Chain {
        subject: String,
        /// Write the bundle to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the SHA-1 fingerprint of a PEM certificate file
    Fingerprint { cert: PathBuf },
    /// Export a subject's certificate and key as PKCS#12
    #[cfg(feature = "pkcs12")]
    ExportP12 {
        subject: String,
        /// Output file
        #[arg(short, long)]
        out: PathBuf,
        /// Bundle password; defaults to the subject
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Issue every identity of a TOML plan and write its bundles
    Provision { plan: PathBuf },
}

fn start_logger(verbose: u8) {
    let default_level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn service(cli: &Cli) -> Result<IssuanceService<DirectoryStore>> {
    let config = IssuanceConfig::default().with_env_overrides()?;
    Ok(IssuanceService::with_config(
        DirectoryStore::open(&cli.dir)?,
        config,
    ))
}

fn write_output(out: &Option<PathBuf>, contents: &[u8]) -> Result<()> {
    match out {
        Some(path) => fs::write(path, contents).map_err(|e| {
            CertTreeError::StorageError(format!("cannot write {}: {e}", path.display()))
        }),
        None => {
            print!("{}", String::from_utf8_lossy(contents));
            Ok(())
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Issue {
            subject,
            role,
            issuer,
        } => {
            let record = service(cli)?.issue(subject, *role, issuer.as_deref())?;
            println!("{} {}", record.subject, record.fingerprint);
        }
        Command::Chain { subject, out } => {
            let pem = service(cli)?.chain_pem(subject)?;
            write_output(out, pem.as_bytes())?;
        }
        Command::Fingerprint { cert } => {
            let pem = fs::read_to_string(cert).map_err(|e| {
                CertTreeError::StorageError(format!("cannot read {}: {e}", cert.display()))
            })?;
            println!("{}", Certificate::from_pem(&pem)?.fingerprint()?);
        }
        #[cfg(feature = "pkcs12")]
        Command::ExportP12 {
            subject,
            out,
            password,
        } => {
            let der = service(cli)?.export_pkcs12(subject, password.as_deref())?;
            write_output(&Some(out.clone()), &der)?;
        }
        Command::Provision { plan } => {
            let plan = ProvisionPlan::from_file(plan)?;
            let report = provision(&plan, &cli.dir)?;
            for (subject, fingerprint) in &report.issued {
                println!("{subject} {fingerprint}");
            }
            for path in &report.chain_files {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    start_logger(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(category = ?err.category(), "{err}");
            match err.category() {
                ErrorCategory::BadInput => ExitCode::from(2),
                ErrorCategory::MissingDependency => ExitCode::from(3),
                ErrorCategory::DataIntegrity => ExitCode::from(4),
                ErrorCategory::Internal => ExitCode::FAILURE,
            }
        }
    }
}
