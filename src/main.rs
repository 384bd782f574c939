//! strict-hosts CLI
//!
//! Entry point for the `strict-hosts` command-line tool.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use rand::RngCore;
use serde::Serialize;
use ssh_key::{HashAlg, PublicKey};
use strict_hosts::{
    search_with_budget, HostKeyEntry, KnownHostsConfig, KnownHostsRegistry, LookupBudget, Scope,
    TimedLookupError,
};
use strict_hosts_format::HashedHost;
use tracing_subscriber::EnvFilter;

/// Exit code when a host is unknown or its key does not match.
const EXIT_REJECTED: i32 = 1;
/// Exit code for configuration, I/O and decode errors.
const EXIT_ERROR: i32 = 2;

/// Salt length OpenSSH uses for hashed host names.
const HASH_SALT_LEN: usize = 20;

#[derive(Parser)]
#[command(name = "strict-hosts")]
#[command(about = "Fail-closed SSH known_hosts lookups", version)]
struct Cli {
    /// Path to config file (default: ~/.config/strict-hosts/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Which files to consult: all, global or user
    #[arg(long, global = true)]
    scope: Option<Scope>,

    /// Global known_hosts file (repeatable, replaces the configured list)
    #[arg(long = "global-file", global = true)]
    global_files: Vec<String>,

    /// User known_hosts file (repeatable, replaces the configured list)
    #[arg(long = "user-file", global = true)]
    user_files: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the keys on record for a host
    Lookup {
        /// Host name as used for the connection
        host: String,

        /// Other names the host may be recorded under, e.g. "[host]:2222"
        #[arg(long = "alias", short = 'a')]
        aliases: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Lookup budget in seconds (default: from config)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Check an offered host key against the keys on record
    Check {
        /// Host name as used for the connection
        host: String,

        /// Offered key as "<type> <base64>"
        #[arg(long)]
        key: String,

        /// Other names the host may be recorded under
        #[arg(long = "alias", short = 'a')]
        aliases: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the hashed form of a host name
    Hash {
        host: String,

        /// Base64 salt (default: 20 random bytes)
        #[arg(long)]
        salt: Option<String>,
    },

    /// List the known_hosts files that would be consulted
    Files {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct KeyReport {
    key_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl KeyReport {
    fn from_entry(entry: &HostKeyEntry) -> Self {
        match entry.resolve() {
            Ok(key) => Self {
                key_type: entry.key_type().to_string(),
                fingerprint: Some(key.fingerprint(HashAlg::Sha256).to_string()),
                error: None,
            },
            Err(e) => Self {
                key_type: entry.key_type().to_string(),
                fingerprint: None,
                error: Some(e.to_string()),
            },
        }
    }
}

fn main() {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=strict_hosts=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);

    match cli.command {
        Commands::Lookup {
            host,
            aliases,
            json,
            timeout,
        } => run_lookup(&config, &host, &aliases, json, timeout),
        Commands::Check {
            host,
            key,
            aliases,
            json,
        } => run_check(&config, &host, &key, &aliases, json),
        Commands::Hash { host, salt } => run_hash(&host, salt),
        Commands::Files { json } => run_files(&config, json),
    }
}

fn load_config(cli: &Cli) -> KnownHostsConfig {
    let loaded = match cli.config {
        Some(ref path) => KnownHostsConfig::load(path),
        None => KnownHostsConfig::load_default(),
    };

    let mut config = match loaded {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(EXIT_ERROR);
        }
    };

    if !cli.global_files.is_empty() {
        config.global_known_hosts_files = Some(cli.global_files.clone());
    }
    if !cli.user_files.is_empty() {
        config.user_known_hosts_files = Some(cli.user_files.clone());
    }
    if let Some(scope) = cli.scope {
        config.scope = scope;
    }

    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        process::exit(EXIT_ERROR);
    }
    config
}

fn alias_refs(aliases: &[String]) -> Vec<&str> {
    aliases.iter().map(String::as_str).collect()
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(EXIT_ERROR);
        }
    }
}

fn run_lookup(
    config: &KnownHostsConfig,
    host: &str,
    aliases: &[String],
    json_output: bool,
    timeout: Option<u64>,
) {
    let budget = timeout.map(LookupBudget::new).unwrap_or_else(|| config.lookup_budget());
    if let Err(e) = budget.validate() {
        eprintln!("Invalid timeout: {}", e);
        process::exit(EXIT_ERROR);
    }

    let registry = Arc::new(KnownHostsRegistry::new(config, config.scope));
    let keys = match search_with_budget(&registry, host, &alias_refs(aliases), budget) {
        Ok(keys) => keys,
        Err(TimedLookupError::Elapsed(limit)) => {
            // The scan keeps the file lock; exit without waiting for it.
            eprintln!("Lookup for {} did not finish within {:?}", host, limit);
            process::exit(EXIT_ERROR);
        }
        Err(e) => {
            eprintln!("Lookup failed: {}", e);
            process::exit(EXIT_ERROR);
        }
    };
    registry.close();

    let reports: Vec<KeyReport> = keys.iter().map(|k| KeyReport::from_entry(k)).collect();

    if json_output {
        print_json(&serde_json::json!({
            "host": host,
            "known": !reports.is_empty(),
            "keys": reports,
        }));
    } else if reports.is_empty() {
        println!("{}: no keys on record", host);
    } else {
        println!("{}: {} key(s) on record", host, reports.len());
        for report in &reports {
            match (&report.fingerprint, &report.error) {
                (Some(fp), _) => println!("  {} {}", report.key_type, fp),
                (None, Some(err)) => println!("  {} <undecodable: {}>", report.key_type, err),
                (None, None) => println!("  {}", report.key_type),
            }
        }
    }

    if reports.is_empty() {
        process::exit(EXIT_REJECTED);
    }
}

fn run_check(
    config: &KnownHostsConfig,
    host: &str,
    key_line: &str,
    aliases: &[String],
    json_output: bool,
) {
    let offered = match PublicKey::from_openssh(key_line.trim()) {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Invalid offered key: {}", e);
            process::exit(EXIT_ERROR);
        }
    };

    let registry = KnownHostsRegistry::new(config, config.scope);
    let outcome = registry
        .search_for(host, &alias_refs(aliases))
        .map_err(|e| e.to_string())
        .and_then(|keys| {
            keys.contains(&offered)
                .map(|matched| (matched, keys.len()))
                .map_err(|e| e.to_string())
        });
    registry.close();

    let (matched, recorded) = match outcome {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Check failed: {}", e);
            process::exit(EXIT_ERROR);
        }
    };

    if json_output {
        print_json(&serde_json::json!({
            "host": host,
            "key_type": offered.algorithm().to_string(),
            "fingerprint": offered.fingerprint(HashAlg::Sha256).to_string(),
            "recorded_keys": recorded,
            "matched": matched,
        }));
    } else if matched {
        println!("{}: offered key is on record", host);
    } else if recorded == 0 {
        println!("{}: host is not known; rejecting", host);
    } else {
        println!(
            "{}: offered key does not match any of {} recorded key(s); rejecting",
            host, recorded
        );
    }

    if !matched {
        process::exit(EXIT_REJECTED);
    }
}

fn run_hash(host: &str, salt: Option<String>) {
    let salt = match salt {
        Some(encoded) => match STANDARD.decode(encoded.trim()) {
            Ok(s) if !s.is_empty() => s,
            Ok(_) => {
                eprintln!("Salt must not be empty");
                process::exit(EXIT_ERROR);
            }
            Err(e) => {
                eprintln!("Invalid salt: {}", e);
                process::exit(EXIT_ERROR);
            }
        },
        None => {
            let mut salt = vec![0u8; HASH_SALT_LEN];
            rand::thread_rng().fill_bytes(&mut salt);
            salt
        }
    };

    println!("{}", HashedHost::token(&salt, host));
}

fn run_files(config: &KnownHostsConfig, json_output: bool) {
    let files: Vec<(PathBuf, bool)> = config
        .files()
        .into_iter()
        .map(|path| {
            let readable = path.is_file() && std::fs::File::open(&path).is_ok();
            (path, readable)
        })
        .collect();

    if json_output {
        let output: Vec<serde_json::Value> = files
            .iter()
            .map(|(path, readable)| {
                serde_json::json!({
                    "path": path.display().to_string(),
                    "readable": readable,
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "scope": config.scope.to_string(),
            "files": output,
        }));
        return;
    }

    println!("Known hosts files (scope: {}):\n", config.scope);
    for (path, readable) in &files {
        let status = if *readable { "readable" } else { "missing" };
        println!("  {} ({})", path.display(), status);
    }
}
