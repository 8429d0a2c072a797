use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;
use truadboon::{
    FileRegistry, Foundation, InMemoryRegistry, Verifier, VerifyHints,
};

const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 3000;

#[derive(Parser, Debug)]
#[command(name = "truadboon", version, about = "Thai donation account verification")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a PromptPay payload and print the structured record
    Decode {
        /// Raw EMV-QR text payload
        payload: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve the canonical identifier of a payload
    Extract {
        /// Raw EMV-QR text payload
        payload: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the receiver display name of a payload
    Name {
        /// Raw EMV-QR text payload
        payload: String,
    },
    /// Verdict an account against the trust registry and the blacklist
    Verify {
        /// Account number, PromptPay identifier, or text reference
        account: String,
        /// Receiver name hint used when no registry entry matches
        #[arg(long)]
        name: Option<String>,
        /// Bank code hint
        #[arg(long)]
        bank: Option<String>,
        /// Audit log source label
        #[arg(long, default_value = "CLI")]
        source: String,
        /// Audit log user id
        #[arg(long)]
        user: Option<String>,
        /// Directory holding foundations.json, blacklist.json, audit.log
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Per-lookup timeout in milliseconds
        #[arg(long, default_value_t = DEFAULT_LOOKUP_TIMEOUT_MS)]
        timeout_ms: u64,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the trusted foundation registry
    Foundations {
        /// Directory holding foundations.json, blacklist.json, audit.log
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Truadboon(#[from] truadboon::TruadboonError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "truadboon=warn".into()),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Decode { payload, json } => cmd_decode(&payload, json),
        Commands::Extract { payload, json } => cmd_extract(&payload, json),
        Commands::Name { payload } => cmd_name(&payload),
        Commands::Verify {
            account,
            name,
            bank,
            source,
            user,
            registry,
            timeout_ms,
            json,
        } => {
            let hints = VerifyHints {
                account_name: name,
                bank,
                source,
                user_id: user,
            };
            cmd_verify(&account, hints, registry.as_deref(), timeout_ms, json)
        }
        Commands::Foundations { registry, json } => cmd_foundations(registry.as_deref(), json),
    }
}

fn cmd_decode(payload: &str, json: bool) -> Result<(), CliError> {
    let record = truadboon::decode_payload(payload);
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    if let Some(proxy_type) = record.proxy_type {
        println!("proxy_type={proxy_type}");
    }
    for (label, slot) in [
        ("proxy_type_code", &record.proxy_type_code),
        ("phone_number", &record.phone_number),
        ("tax_id", &record.tax_id),
        ("account_number", &record.account_number),
        ("organization_reference", &record.organization_reference),
        ("donation_box_account", &record.donation_box_account),
        ("reference_number", &record.reference_number),
        ("name", &record.name),
        ("currency", &record.currency),
        ("country", &record.country),
    ] {
        if let Some(value) = slot {
            println!("{label}={value}");
        }
    }
    if let Some(amount) = record.amount {
        println!("amount={amount}");
    }
    if record.promptpay_guid {
        println!("promptpay_guid=true");
    }
    if record.dropped_bytes > 0 {
        println!("dropped_bytes={}", record.dropped_bytes);
    }
    Ok(())
}

fn cmd_extract(payload: &str, json: bool) -> Result<(), CliError> {
    let extracted = truadboon::extract_identifier(payload);
    if json {
        println!("{}", serde_json::to_string_pretty(&extracted)?);
        return Ok(());
    }
    match &extracted.value {
        Some(value) => println!("{} {}", extracted.kind, value),
        None => println!("{}", extracted.kind),
    }
    Ok(())
}

fn cmd_name(payload: &str) -> Result<(), CliError> {
    if let Some(name) = truadboon::extract_receiver_name(payload) {
        println!("{name}");
    }
    Ok(())
}

fn cmd_verify(
    account: &str,
    hints: VerifyHints,
    registry: Option<&Path>,
    timeout_ms: u64,
    json: bool,
) -> Result<(), CliError> {
    let verifier =
        build_verifier(registry)?.with_lookup_timeout(Duration::from_millis(timeout_ms));
    let result = verifier.verify(account, &hints)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    println!("status={}", result.status);
    println!("matched_type={}", result.matched_type.as_str());
    println!("account_name={}", result.account_name);
    println!("account_number={}", result.account_number);
    println!("bank={}", result.bank);
    println!("message={}", result.message);
    Ok(())
}

fn build_verifier(registry: Option<&Path>) -> Result<Verifier, CliError> {
    Ok(match registry {
        Some(dir) => Verifier::from_registry(Arc::new(FileRegistry::open(dir)?)),
        None => Verifier::from_registry(Arc::new(InMemoryRegistry::seeded())),
    })
}

fn cmd_foundations(registry: Option<&Path>, json: bool) -> Result<(), CliError> {
    let foundations: Vec<Foundation> = match registry {
        Some(dir) => FileRegistry::open(dir)?.foundations().to_vec(),
        None => InMemoryRegistry::seeded().foundations().to_vec(),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&foundations)?);
        return Ok(());
    }
    for foundation in &foundations {
        println!(
            "{}\t{}\t{}\t{}",
            foundation.account_number, foundation.bank, foundation.category, foundation.name
        );
    }
    Ok(())
}
