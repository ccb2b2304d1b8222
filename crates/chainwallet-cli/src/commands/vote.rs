//! Vote command.
//!
//! The account state is not observable offline, so the caller passes the
//! current spending counter (and optionally the balance) as read from
//! the network.

use std::path::PathBuf;

use chainwallet_chain::scanner::scan_block0;
use chainwallet_types::{SpendingCounter, Value};
use chainwallet_wallet::Proposal;
use clap::Args;

use super::{read_file, KeyArgs};
use crate::output::{self, parse_hex_array};
use crate::GlobalOpts;

#[derive(Args)]
pub struct VoteArgs {
    #[command(flatten)]
    pub keys: KeyArgs,

    /// Block0 file, for the network settings.
    #[arg(long)]
    pub block0: PathBuf,

    /// Vote plan id as 64 hex characters.
    #[arg(long)]
    pub vote_plan: String,

    /// Proposal index inside the vote plan.
    #[arg(long)]
    pub proposal: u8,

    /// Number of choices the proposal offers (1 to 16).
    #[arg(long)]
    pub num_choices: u8,

    /// Payload type (1 = public).
    #[arg(long, default_value_t = 1)]
    pub payload_type: u8,

    /// Chosen option, below `--num-choices`.
    #[arg(long)]
    pub choice: u8,

    /// Current spending counter of the account.
    #[arg(long, default_value_t = 0)]
    pub counter: u32,

    /// Current account balance.
    #[arg(long, default_value_t = 0)]
    pub value: u64,
}

pub fn run(args: VoteArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let plan = parse_hex_array::<32>("vote plan", &args.vote_plan)?;
    let proposal = Proposal::from_raw(plan, args.payload_type, args.proposal, args.num_choices)
        .map_err(|e| e.to_string())?;

    let mut wallet = args.keys.load(&opts.recovery)?;
    let block0 = read_file("block0", &args.block0)?;
    let settings = scan_block0(&block0).map_err(|e| e.to_string())?.settings;
    wallet.set_state(Value::new(args.value), SpendingCounter::new(args.counter));

    let bytes = wallet
        .vote(&settings, &proposal, args.choice)
        .map_err(|e| e.to_string())?;
    let fragment = wallet
        .pending_transactions()
        .last()
        .map(ToString::to_string)
        .unwrap_or_default();

    output::print_object(
        &serde_json::json!({
            "fragment_id": fragment,
            "counter": wallet.spending_counter().as_u32(),
            "transaction": hex::encode(bytes),
        }),
        opts.json,
    );
    Ok(())
}
