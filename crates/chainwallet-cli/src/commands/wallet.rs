//! Wallet commands: recover, scan and convert.
//!
//! All three work offline on a block0 file; nothing is broadcast.

use std::path::PathBuf;

use chainwallet_chain::scanner::OutputAddress;
use chainwallet_wallet::matcher::MatchedFund;
use clap::Args;

use super::{read_file, write_file, KeyArgs, Network};
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct RecoverArgs {
    #[command(flatten)]
    pub keys: KeyArgs,

    /// Network of the printed account address.
    #[arg(long, value_enum, default_value = "production")]
    pub network: Network,
}

#[derive(Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub keys: KeyArgs,

    /// Block0 file.
    #[arg(long)]
    pub block0: PathBuf,
}

#[derive(Args)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub keys: KeyArgs,

    /// Block0 file.
    #[arg(long)]
    pub block0: PathBuf,

    /// Write transactions here, one hex line each, instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn recover(args: RecoverArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let wallet = args.keys.load(&opts.recovery)?;
    let address = wallet.account_address(args.network.into());

    output::print_object(
        &serde_json::json!({
            "id": wallet.id().to_string(),
            "account_address": address.to_string(),
        }),
        opts.json,
    );
    Ok(())
}

pub fn scan(args: ScanArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let mut wallet = args.keys.load(&opts.recovery)?;
    let block0 = read_file("block0", &args.block0)?;
    let settings = wallet.retrieve_funds(&block0).map_err(|e| e.to_string())?;

    if opts.json {
        let funds: Vec<serde_json::Value> = wallet
            .matched_funds()
            .iter()
            .map(|f| {
                serde_json::json!({
                    "fragment": f.pointer.fragment_id.to_string(),
                    "index": f.pointer.output_index,
                    "value": f.value().as_u64(),
                    "address": address_string(&f.address),
                    "path": f.path.to_string(),
                })
            })
            .collect();
        let obj = serde_json::json!({
            "settings": settings,
            "funds": funds,
            "total": wallet.total_value().as_u64(),
        });
        println!("{obj}");
        return Ok(());
    }

    output::print_kv("Block0", &settings.block0_hash.to_string(), false);
    output::print_kv("Network", &settings.discrimination.to_string(), false);
    output::print_kv(
        "Fees",
        &format!(
            "{} + {} per input/output",
            settings.fees.constant, settings.fees.coefficient
        ),
        false,
    );
    let rows: Vec<Vec<String>> = wallet.matched_funds().iter().map(fund_row).collect();
    output::print_table(&["fragment", "index", "value", "path"], &rows);
    output::print_kv("Total", &wallet.total_value().to_string(), false);
    Ok(())
}

pub fn convert(args: ConvertArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let mut wallet = args.keys.load(&opts.recovery)?;
    let block0 = read_file("block0", &args.block0)?;
    let settings = wallet.retrieve_funds(&block0).map_err(|e| e.to_string())?;
    let conversion = wallet.convert(&settings).map_err(|e| e.to_string())?;

    let lines: Vec<String> = conversion.transactions().map(hex::encode).collect();
    if let Some(path) = &args.out {
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        write_file("transactions", path, text.as_bytes())?;
    }

    let mut summary = serde_json::json!({
        "transactions": conversion.len(),
        "moved": conversion.moved_value().as_u64(),
        "fees": conversion.fees().as_u64(),
        "ignored_value": conversion.ignored_value().as_u64(),
        "ignored_count": conversion.ignored_count(),
    });

    if opts.json {
        if args.out.is_none() {
            summary["fragments"] = serde_json::json!(lines);
        }
        println!("{summary}");
        return Ok(());
    }

    output::print_object(&summary, false);
    match &args.out {
        Some(path) => output::print_success(
            &format!("{} transaction(s) written to {}", lines.len(), path.display()),
            false,
        ),
        None => {
            for line in &lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn fund_row(fund: &MatchedFund) -> Vec<String> {
    vec![
        fund.pointer.fragment_id.to_string(),
        fund.pointer.output_index.to_string(),
        fund.value().to_string(),
        fund.path.to_string(),
    ]
}

fn address_string(address: &OutputAddress) -> String {
    match address {
        OutputAddress::Legacy(legacy) => legacy.to_string(),
        OutputAddress::Native(native) => native.to_string(),
    }
}
