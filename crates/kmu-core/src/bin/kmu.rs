//! kmu: command-line tool for key material unit containers.
//!
//! Keys live in a keystore file; documents to sign travel as transaction
//! containers. Every command prints a JSON summary on stdout and logs to
//! stderr (or `LOG_FILE`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kmu_core::format;
use kmu_core::key::{BoxingKeyContents, SecretBoxKeyContents, SigningKeyContents};
use kmu_core::logging::subsystem;
use kmu_core::protect;
use kmu_core::sig::{verify, CanonicalSigner};
use kmu_core::{Kmu, KmuConfig, Password, SystemClock};

#[derive(Parser)]
#[command(name = "kmu")]
#[command(author, version, about = "Key material units with canonical signatures")]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: ~/.config/kmu/kmu.toml, then KMU_* env vars)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Usage {
    Signing,
    Boxing,
    Secretbox,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty transaction container
    Init {
        /// Output container file
        #[arg(short, long)]
        output: PathBuf,

        /// Admin contact (default: from config)
        #[arg(short, long)]
        admin: Option<String>,
    },

    /// Generate a key into a keystore (created if missing)
    Keygen {
        /// Keystore file
        #[arg(short, long)]
        keystore: PathBuf,

        /// What the key is for
        #[arg(short, long, value_enum, default_value = "signing")]
        usage: Usage,
    },

    /// Password-protect every open key in a keystore
    Protect {
        /// Keystore file
        #[arg(short, long)]
        keystore: PathBuf,

        /// Password (min 12 characters)
        #[arg(short, long, env = "KMU_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Open every protected key in a keystore
    Open {
        /// Keystore file
        #[arg(short, long)]
        keystore: PathBuf,

        /// Password used to protect the keys
        #[arg(short, long, env = "KMU_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign every block of a container and append the signature
    Sign {
        /// Container to sign
        #[arg(short, long)]
        input: PathBuf,

        /// Keystore holding the signing key
        #[arg(short, long)]
        keystore: PathBuf,

        /// Signer label written into SignedBy
        #[arg(short = 'b', long)]
        signed_by: String,

        /// Output file (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Digest tag (default: from config)
        #[arg(short, long)]
        digest: Option<String>,

        /// Password, if the signing key is protected
        #[arg(short, long, env = "KMU_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Verify the signature in a container
    Verify {
        /// Container to verify
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print a container
    Show {
        /// Container file
        #[arg(short, long)]
        input: PathBuf,

        /// Only print U and X blocks
        #[arg(long)]
        keys_only: bool,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_logging();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(subsystem = subsystem::CLI, error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "kmu=info,kmu_core=info")
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kmu=info,kmu_core=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let file_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        let file_name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("kmu.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // stdout carries command output
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match cli.config {
        Some(ref path) => KmuConfig::from_file(path),
        None => KmuConfig::load(),
    }
    .context("Failed to load configuration")?;

    match cli.command {
        Commands::Init { output, admin } => cmd_init(&config, &output, admin),
        Commands::Keygen { keystore, usage } => cmd_keygen(&config, &keystore, usage),
        Commands::Protect { keystore, password } => {
            cmd_protect(&config, &keystore, Password::new(password))
        }
        Commands::Open { keystore, password } => {
            cmd_open(&config, &keystore, Password::new(password))
        }
        Commands::Sign {
            input,
            keystore,
            signed_by,
            output,
            digest,
            password,
        } => cmd_sign(
            &config,
            &input,
            &keystore,
            &signed_by,
            output.as_deref(),
            digest.as_deref(),
            password.map(Password::new),
        ),
        Commands::Verify { input } => cmd_verify(&input),
        Commands::Show { input, keys_only } => cmd_show(&config, &input, keys_only),
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_container(path: &Path) -> anyhow::Result<Kmu> {
    format::read_file(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn cmd_init(config: &KmuConfig, output: &Path, admin: Option<String>) -> anyhow::Result<()> {
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    let admin = admin
        .or_else(|| config.admin_contact.clone())
        .ok_or_else(|| anyhow!("No admin contact given and none configured"))?;

    let kmu = Kmu::transaction(admin);
    format::write_file(&kmu, output, config.pretty)?;

    print_json(&serde_json::json!({
        "handle": kmu.handle(),
        "admin_contact": kmu.admin_contact(),
        "path": output.to_string_lossy(),
    }))
}

fn cmd_keygen(config: &KmuConfig, keystore: &Path, usage: Usage) -> anyhow::Result<()> {
    let mut kmu = if keystore.exists() {
        read_container(keystore)?
    } else {
        Kmu::keystore()
    };
    if kmu.is_transaction() {
        bail!("{} is a transaction container, not a keystore", keystore.display());
    }

    let mut rng = rand::thread_rng();
    let block = match usage {
        Usage::Signing => SigningKeyContents::generate(&mut rng, &SystemClock).to_block()?,
        Usage::Boxing => BoxingKeyContents::generate(&mut rng, &SystemClock).to_block()?,
        Usage::Secretbox => SecretBoxKeyContents::generate(&mut rng, &SystemClock).to_block()?,
    };
    let name = block.name().to_string();
    let handle = block.base_handle().to_string();
    kmu.add_block(block)?;
    format::write_file(&kmu, keystore, config.pretty)?;

    print_json(&serde_json::json!({
        "handle": handle,
        "block": name,
        "key_usage": kmu.get(&name).and_then(|b| b.key_usage()).map(|u| u.to_string()),
        "keystore": keystore.to_string_lossy(),
    }))
}

fn cmd_protect(config: &KmuConfig, keystore: &Path, password: Password) -> anyhow::Result<()> {
    let mut kmu = read_container(keystore)?;
    let count = protect::protect_with(&mut kmu, password, &config.kdf, &mut rand::thread_rng())?;
    format::write_file(&kmu, keystore, config.pretty)?;

    print_json(&serde_json::json!({
        "protected": count,
        "keystore": keystore.to_string_lossy(),
    }))
}

fn cmd_open(config: &KmuConfig, keystore: &Path, password: Password) -> anyhow::Result<()> {
    let mut kmu = read_container(keystore)?;
    let count = protect::open(&mut kmu, password)?;
    format::write_file(&kmu, keystore, config.pretty)?;

    print_json(&serde_json::json!({
        "opened": count,
        "keystore": keystore.to_string_lossy(),
    }))
}

fn cmd_sign(
    config: &KmuConfig,
    input: &Path,
    keystore: &Path,
    signed_by: &str,
    output: Option<&Path>,
    digest: Option<&str>,
    password: Option<Password>,
) -> anyhow::Result<()> {
    let mut keys = read_container(keystore)?;
    // Protected keys are opened in memory only; the keystore file is untouched.
    if let Some(password) = password {
        protect::open(&mut keys, password)?;
    }
    let key_block = keys
        .signing_key()
        .ok_or_else(|| anyhow!("No open signing key in {}", keystore.display()))?;
    let key = SigningKeyContents::from_block(key_block)?;

    let digest = match digest {
        Some(tag) => kmu_core::DigestAlgorithm::from_tag(tag)?,
        None => config.digest()?,
    };

    let mut kmu = read_container(input)?;
    if kmu.get(key.pub_block().name()).is_none() {
        kmu.add_block(key.pub_block())?;
    }

    let mut signer = CanonicalSigner::new(signed_by, &key)?.with_digest(digest);
    signer.add_kmu_blocks(&kmu);
    let signature = signer.sign()?;
    let sig_block = signature.to_block();
    let sig_name = sig_block.name().to_string();
    kmu.add_block(sig_block)?;

    let output = output.unwrap_or(input);
    format::write_file(&kmu, output, config.pretty)?;

    print_json(&serde_json::json!({
        "signature": sig_name,
        "signed_with": key.handle(),
        "digest": digest.tag(),
        "data_refs": signature.data_refs.len(),
        "path": output.to_string_lossy(),
    }))
}

fn cmd_verify(input: &Path) -> anyhow::Result<()> {
    let kmu = read_container(input)?;
    let verified = verify(&kmu).with_context(|| format!("Verification failed for {}", input.display()))?;

    print_json(&serde_json::json!({
        "valid": true,
        "signature": verified.signature_block,
        "signed_by": verified.signed_by,
        "signed_with": verified.signed_with,
        "key_block": verified.key_block,
        "digest": verified.digest.tag(),
        "created_on": verified.created_on,
        "data_refs": verified.token_count,
    }))
}

fn cmd_show(config: &KmuConfig, input: &Path, keys_only: bool) -> anyhow::Result<()> {
    let kmu = read_container(input)?;
    let text = if keys_only {
        format::write_keys(&kmu, config.pretty)?
    } else {
        format::to_string(&kmu, config.pretty)?
    };
    println!("{}", text);
    Ok(())
}
