use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dses_core::commands::{default_root, ensure_initialized};
use dses_core::ledger::SqliteLedger;
use dses_core::utils::logbook::{emit_event, invocation_id};
use dses_core::{Amount, Commands, CoreConfig};

#[derive(Parser)]
#[command(
    name = "dses",
    about = "Operate a local service-marketplace ledger"
)]
struct Cli {
    /// Workspace root (config.toml, ledger, logbook). Defaults to $DSES_ROOT or .dses
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create the workspace and seed a default config
    Init,
    /// Run one ledger function as `caller`
    Invoke {
        /// Address the invocation is attributed to
        #[arg(long)]
        caller: String,
        function: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Credit a token balance on the local ledger
    Fund {
        #[arg(long)]
        address: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        amount: String,
    },
    /// Print a token balance
    Balance {
        #[arg(long)]
        address: String,
        #[arg(long)]
        token: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dses_core=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = cli.root.unwrap_or_else(default_root);
    match cli.cmd {
        Cmd::Init => init(&root),
        Cmd::Invoke {
            caller,
            function,
            args,
        } => invoke(&root, &caller, &function, &args),
        Cmd::Fund {
            address,
            token,
            amount,
        } => fund(&root, &address, &token, &amount),
        Cmd::Balance { address, token } => balance(&root, &address, &token),
    }
}

fn init(root: &Path) -> Result<()> {
    let report = ensure_initialized(root)?;
    for c in &report.created {
        println!("created  {c}");
    }
    for e in &report.existed {
        println!("exists   {e}");
    }
    println!("workspace ready at {}", report.root.display());
    Ok(())
}

fn open(root: &Path) -> Result<(CoreConfig, SqliteLedger)> {
    let cfg = CoreConfig::load(root)?;
    tracing::debug!(ledger = %cfg.storage.ledger_path.display(), "opening ledger");
    let ledger = SqliteLedger::open(&cfg.storage.ledger_path)
        .with_context(|| format!("open ledger {}", cfg.storage.ledger_path.display()))?;
    Ok((cfg, ledger))
}

fn invoke(root: &Path, caller: &str, function: &str, args: &[String]) -> Result<()> {
    let (cfg, mut ledger) = open(root)?;
    let commands = Commands::new(cfg.policy()?);
    let outcome = ledger.invoke(caller, |inv| commands.invoke(inv, function, args));

    let ts = Utc::now().to_rfc3339();
    let id = invocation_id(caller, function, args, &ts);
    let data = match &outcome {
        Ok(payload) => serde_json::json!({
            "id": id,
            "caller": caller,
            "function": function,
            "args": args,
            "ok": true,
            "bytes": payload.len(),
        }),
        Err(e) => serde_json::json!({
            "id": id,
            "caller": caller,
            "function": function,
            "args": args,
            "ok": false,
            "kind": format!("{:?}", e.kind()),
            "error": e.to_string(),
        }),
    };
    emit_event(&cfg.logbook.path, "invoke", data, &ts)?;

    match outcome {
        Ok(payload) => {
            println!("{}", String::from_utf8_lossy(&payload));
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    }
}

fn fund(root: &Path, address: &str, token: &str, amount: &str) -> Result<()> {
    let (cfg, mut ledger) = open(root)?;
    let amount = Amount::parse(amount, "amount")?;
    let held = ledger.fund(address, token, &amount)?;
    emit_event(
        &cfg.logbook.path,
        "fund",
        serde_json::json!({ "address": address, "token": token, "amount": amount }),
        &Utc::now().to_rfc3339(),
    )?;
    println!("{address} holds {held} {token}");
    Ok(())
}

fn balance(root: &Path, address: &str, token: &str) -> Result<()> {
    let (_, ledger) = open(root)?;
    println!("{}", ledger.balance(address, token)?);
    Ok(())
}
