//! Gatekeeper CLI
//!
//! Confines requested file names to an allowed directory, issues random
//! tokens and hashes credentials from the command line.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gatekeeper::{collision_probability, CredentialHasher, PathGuard, TokenGenerator};
use gatekeeper_cli::config::{default_config_path, Config};
use gatekeeper_cli::logging::{init_logging, LogConfig};
use gatekeeper_cli::outcome::{
    exit_code, DigestReport, ErrorReport, ResolveReport, TokenReport, VerifyReport, EXIT_FAILURE,
    EXIT_SUCCESS,
};

/// Gatekeeper - path confinement, secure tokens and credential hashing.
#[derive(Parser, Debug)]
#[command(name = "gatekeeper")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Resolve a requested file name inside the allowed directory
    Resolve {
        /// Requested file name
        name: String,

        /// Allowed directory (overrides the configuration)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Follow symlinks on disk and reject targets outside the root
        #[arg(long)]
        check_disk: bool,
    },

    /// Generate random URL-safe tokens
    Token {
        /// Token length in bytes (1-1024, default from configuration)
        #[arg(long, short, allow_negative_numbers = true)]
        length: Option<i64>,

        /// Number of tokens to generate
        #[arg(long, short = 'n', default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
        count: u64,
    },

    /// Hash a credential
    Hash {
        /// Secret to hash (prefer --stdin to keep it out of shell history)
        #[arg(conflicts_with = "stdin")]
        secret: Option<String>,

        /// Read the secret from standard input
        #[arg(long)]
        stdin: bool,

        /// Hash algorithm (sha256, sha384, sha512)
        #[arg(long, short)]
        algorithm: Option<String>,

        /// Digest encoding (base64, hex)
        #[arg(long, short)]
        encoding: Option<String>,
    },

    /// Check a credential against a stored digest
    Verify {
        /// Stored digest to compare against
        #[arg(long, short)]
        digest: String,

        /// Secret to check
        #[arg(conflicts_with = "stdin")]
        secret: Option<String>,

        /// Read the secret from standard input
        #[arg(long)]
        stdin: bool,

        /// Hash algorithm the digest was produced with
        #[arg(long, short)]
        algorithm: Option<String>,

        /// Encoding of the stored digest
        #[arg(long, short)]
        encoding: Option<String>,
    },

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            let code = exit_code(&err);
            if json {
                let report = ErrorReport::from_error(&err);
                match serde_json::to_string(&report) {
                    Ok(line) => println!("{}", line),
                    Err(_) => eprintln!("Error: {:#}", err),
                }
            } else {
                eprintln!("Error: {:#}", err);
            }
            code
        }
    };

    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    let overrides = config.apply_env_overrides();

    if let Commands::Config(cmd) = &cli.command {
        return run_config(cmd, &config, &config_path);
    }

    if let Commands::Resolve {
        root: Some(root), ..
    } = &cli.command
    {
        config.paths.allowed_root = root.clone();
    }

    config.validate_logging()?;

    let _guard = init_logging(LogConfig {
        level: &config.logging.log_level,
        verbose: cli.verbose,
        directory: config.logging.directory.as_deref(),
    })?;

    tracing::debug!(config = %config_path.display(), "Configuration loaded");
    for applied in &overrides {
        tracing::info!(
            variable = applied.variable,
            value = %applied.value,
            "Applied environment override"
        );
    }

    // Each command builds only the component it uses.
    match cli.command {
        Commands::Resolve {
            name, check_disk, ..
        } => {
            config.validate_paths()?;
            let guard = config.build_path_guard()?;
            run_resolve(&guard, &name, check_disk, cli.json)
        }
        Commands::Token { length, count } => {
            config.validate_tokens()?;
            let generator = config.build_token_generator()?;
            run_token(&generator, length, count, cli.json)
        }
        Commands::Hash {
            secret,
            stdin,
            algorithm,
            encoding,
        } => {
            let hasher = select_hasher(&config, algorithm.as_deref(), encoding.as_deref())?;
            let secret = read_secret(secret, stdin)?;
            run_hash(&hasher, &secret, cli.json)
        }
        Commands::Verify {
            digest,
            secret,
            stdin,
            algorithm,
            encoding,
        } => {
            let hasher = select_hasher(&config, algorithm.as_deref(), encoding.as_deref())?;
            let secret = read_secret(secret, stdin)?;
            run_verify(&hasher, &secret, &digest, cli.json)
        }
        Commands::Config(cmd) => run_config(&cmd, &config, &config_path),
    }
}

fn run_resolve(
    guard: &PathGuard,
    name: &str,
    check_disk: bool,
    json: bool,
) -> anyhow::Result<i32> {
    let resolved = if check_disk {
        guard.resolve_existing(name)?
    } else {
        guard.resolve(name)?
    };

    if json {
        let report = ResolveReport {
            requested: name.to_string(),
            path: resolved.as_path().to_path_buf(),
            relative: resolved.relative().to_path_buf(),
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", resolved);
    }

    Ok(EXIT_SUCCESS)
}

fn run_token(
    generator: &TokenGenerator,
    length: Option<i64>,
    count: u64,
    json: bool,
) -> anyhow::Result<i32> {
    let mut tokens = Vec::new();
    for _ in 0..count {
        let token = match length {
            Some(length) => generator.generate(length)?,
            None => generator.generate_default()?,
        };
        tokens.push(token.into_string());
    }

    let byte_length = match length {
        Some(length) => usize::try_from(length)?,
        None => generator.default_length(),
    };

    if json {
        let report = TokenReport {
            byte_length,
            collision_probability: collision_probability(byte_length, count),
            tokens,
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    Ok(EXIT_SUCCESS)
}

fn run_hash(hasher: &CredentialHasher, secret: &str, json: bool) -> anyhow::Result<i32> {
    let digest = hasher.hash(secret)?;

    if json {
        let report = DigestReport {
            algorithm: digest.algorithm(),
            encoding: digest.encoding(),
            digest: digest.into_string(),
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", digest);
    }

    Ok(EXIT_SUCCESS)
}

fn run_verify(
    hasher: &CredentialHasher,
    secret: &str,
    digest: &str,
    json: bool,
) -> anyhow::Result<i32> {
    let matches = hasher.verify_encoded(secret, digest)?;

    if json {
        let report = VerifyReport {
            algorithm: hasher.algorithm(),
            matches,
        };
        println!("{}", serde_json::to_string(&report)?);
    } else if matches {
        println!("match");
    } else {
        println!("mismatch");
    }

    Ok(if matches { EXIT_SUCCESS } else { EXIT_FAILURE })
}

fn run_config(cmd: &ConfigCommands, config: &Config, path: &Path) -> anyhow::Result<i32> {
    match cmd {
        ConfigCommands::Show => {
            print!("{}", config.to_toml()?);
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save(path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }
    Ok(EXIT_SUCCESS)
}

/// Pick the hasher for a hash or verify command.
///
/// Command-line flags override the configured algorithm and encoding.
fn select_hasher(
    config: &Config,
    algorithm: Option<&str>,
    encoding: Option<&str>,
) -> anyhow::Result<CredentialHasher> {
    if algorithm.is_none() && encoding.is_none() {
        config.validate_hashing()?;
        return Ok(config.build_hasher()?);
    }
    let hasher = CredentialHasher::from_names(
        algorithm.unwrap_or(&config.hashing.algorithm),
        encoding.unwrap_or(&config.hashing.encoding),
    )?;
    Ok(hasher)
}

/// Take the secret from the argument or standard input.
///
/// A missing secret becomes an empty string, which the hasher rejects as
/// invalid input.
fn read_secret(secret: Option<String>, stdin: bool) -> anyhow::Result<String> {
    if !stdin {
        return Ok(secret.unwrap_or_default());
    }

    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read secret from stdin")?;
    Ok(strip_line_ending(&buf).to_string())
}

/// Drop one trailing newline left by `echo` or a terminal.
fn strip_line_ending(input: &str) -> &str {
    input
        .strip_suffix("\r\n")
        .or_else(|| input.strip_suffix('\n'))
        .unwrap_or(input)
}
