//! Block0 decoding against hand-assembled snapshots.

use chainwallet_chain::address::{Address, LegacyAddress, LegacyAttributes};
use chainwallet_chain::block::{Block, Block0Builder};
use chainwallet_chain::fragment::{fragment_id, ConfigParam, Fragment};
use chainwallet_chain::scanner::{scan_block0, OutputAddress};
use chainwallet_chain::settings::Settings;
use chainwallet_chain::transaction::{
    utxo_witness_message, Input, Output, TransactionBuilder, UtxoPointer, Witness,
};
use chainwallet_crypto::signing::Keypair;
use chainwallet_crypto::xprv::XPub;
use chainwallet_types::{Block0Date, Discrimination, FragmentId, Value, WalletError};
use ciborium::Value as Cbor;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn initial() -> Fragment {
    Fragment::Initial(vec![
        ConfigParam::Discrimination(Discrimination::Test),
        ConfigParam::Block0Date(Block0Date::from_secs(1_700_000_000)),
        ConfigParam::LinearFee {
            constant: 100,
            coefficient: 10,
            certificate: 5,
        },
        ConfigParam::MaxInputsPerTransaction(4),
    ])
}

fn declaration() -> std::result::Result<Fragment, WalletError> {
    let address = LegacyAddress::new(&XPub::from_bytes([6; 64]), LegacyAttributes::default())?;
    Ok(Fragment::OldUtxoDeclaration(vec![(address, Value::new(500))]))
}

fn valid_block() -> std::result::Result<Vec<u8>, WalletError> {
    Block0Builder::new(Block0Date::from_secs(1_700_000_000))
        .push(&initial())?
        .push(&declaration()?)?
        .build()
}

/// Decodes `bytes`, lets `edit` modify the header array and re-encodes.
fn with_header(
    bytes: &[u8],
    edit: impl FnOnce(&mut Vec<Cbor>),
) -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut block: Cbor = ciborium::from_reader(bytes)?;
    if let Cbor::Array(items) = &mut block {
        if let Some(Cbor::Array(header)) = items.first_mut() {
            edit(header);
        }
    }
    let mut out = Vec::new();
    ciborium::into_writer(&block, &mut out)?;
    Ok(out)
}

fn assert_malformed(bytes: &[u8]) {
    assert!(matches!(
        scan_block0(bytes),
        Err(WalletError::MalformedBlock { .. })
    ));
}

// ---------------------------------------------------------------------------
// Valid snapshots
// ---------------------------------------------------------------------------

#[test]
fn settings_from_initial_fragment() -> std::result::Result<(), WalletError> {
    let bytes = valid_block()?;
    let snapshot = scan_block0(&bytes)?;
    let block = Block::from_bytes(&bytes)?;

    assert_eq!(snapshot.settings.block0_hash, block.id());
    assert_eq!(snapshot.settings.discrimination, Discrimination::Test);
    assert_eq!(snapshot.settings.block0_date.as_secs(), 1_700_000_000);
    assert_eq!(snapshot.settings.fees.constant, 100);
    assert_eq!(snapshot.settings.fees.coefficient, 10);
    assert_eq!(snapshot.settings.max_inputs_per_transaction, 4);
    assert_eq!(snapshot.outputs.len(), 1);
    assert_eq!(snapshot.outputs[0].pointer.value, Value::new(500));
    Ok(())
}

#[test]
fn scanning_is_deterministic() -> std::result::Result<(), WalletError> {
    let bytes = valid_block()?;
    let a = scan_block0(&bytes)?;
    let b = scan_block0(&bytes)?;
    assert_eq!(a.settings, b.settings);
    assert_eq!(a.outputs, b.outputs);
    Ok(())
}

#[test]
fn transaction_outputs_are_native_records() -> std::result::Result<(), WalletError> {
    let settings = scan_block0(&valid_block()?)?.settings;
    let key = Keypair::from_seed(&[1; 32]);
    let single = Address::single(Discrimination::Test, key.public_key());
    let account = Address::account(Discrimination::Test, key.public_key());

    let mut builder = TransactionBuilder::new(&settings);
    builder
        .add_input(Input::Utxo(UtxoPointer {
            fragment_id: FragmentId::new([3; 32]),
            output_index: 0,
            value: Value::new(1_130),
        }))
        .add_output(Output {
            address: single,
            value: Value::new(600),
        })
        .add_output(Output {
            address: account,
            value: Value::new(400),
        });
    let message = utxo_witness_message(&settings.block0_hash, &builder.sign_data_hash()?);
    let tx = builder.seal(vec![Witness::Utxo(key.sign(&message))])?;
    let tx_fragment = Fragment::Transaction(tx);
    let tx_id = fragment_id(&tx_fragment.to_bytes()?);

    let bytes = Block0Builder::new(Block0Date::from_secs(0))
        .push(&initial())?
        .push(&tx_fragment)?
        .build()?;
    let snapshot = scan_block0(&bytes)?;

    assert_eq!(snapshot.outputs.len(), 2);
    assert_eq!(snapshot.outputs[0].pointer.fragment_id, tx_id);
    assert_eq!(snapshot.outputs[0].address, OutputAddress::Native(single));
    assert!(!snapshot.outputs[0].address.is_account());
    assert!(snapshot.outputs[1].address.is_account());
    Ok(())
}

#[test]
fn settings_shared_read_only() -> std::result::Result<(), WalletError> {
    let settings: Settings = scan_block0(&valid_block()?)?.settings;
    let copy = settings.clone();
    assert_eq!(copy, settings);
    Ok(())
}

// ---------------------------------------------------------------------------
// Malformed snapshots
// ---------------------------------------------------------------------------

#[test]
fn empty_input_rejected() {
    assert_malformed(&[]);
}

#[test]
fn truncated_input_rejected() -> std::result::Result<(), WalletError> {
    let bytes = valid_block()?;
    assert_malformed(&bytes[..bytes.len() - 1]);
    Ok(())
}

#[test]
fn trailing_bytes_rejected() -> std::result::Result<(), WalletError> {
    let mut bytes = valid_block()?;
    bytes.push(0xff);
    assert_malformed(&bytes);
    Ok(())
}

#[test]
fn missing_initial_fragment_rejected() -> std::result::Result<(), WalletError> {
    let bytes = Block0Builder::new(Block0Date::from_secs(0))
        .push(&declaration()?)?
        .build()?;
    assert_malformed(&bytes);
    Ok(())
}

#[test]
fn initial_fragment_must_come_first() -> std::result::Result<(), WalletError> {
    let bytes = Block0Builder::new(Block0Date::from_secs(0))
        .push(&declaration()?)?
        .push(&initial())?
        .build()?;
    assert_malformed(&bytes);
    Ok(())
}

#[test]
fn initial_without_fee_rejected() -> std::result::Result<(), WalletError> {
    let bytes = Block0Builder::new(Block0Date::from_secs(0))
        .push(&Fragment::Initial(vec![ConfigParam::Discrimination(
            Discrimination::Test,
        )]))?
        .build()?;
    assert_malformed(&bytes);
    Ok(())
}

#[test]
fn duplicate_fragment_rejected() -> std::result::Result<(), WalletError> {
    let fragment = declaration()?;
    let bytes = Block0Builder::new(Block0Date::from_secs(0))
        .push(&initial())?
        .push(&fragment)?
        .push(&fragment)?
        .build()?;
    assert_malformed(&bytes);
    Ok(())
}

#[test]
fn content_hash_mismatch_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let bytes = with_header(&valid_block()?, |header| {
        header[4] = Cbor::Bytes(vec![0xee; 32]);
    })?;
    assert_malformed(&bytes);
    Ok(())
}

#[test]
fn non_genesis_header_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let bytes = with_header(&valid_block()?, |header| {
        header[1] = Cbor::Integer(1u8.into());
    })?;
    assert_malformed(&bytes);

    let bytes = with_header(&valid_block()?, |header| {
        header[3] = Cbor::Bytes(vec![1; 32]);
    })?;
    assert_malformed(&bytes);
    Ok(())
}

#[test]
fn garbage_fragment_rejected() -> std::result::Result<(), WalletError> {
    let bytes = Block0Builder::new(Block0Date::from_secs(0))
        .push(&initial())?
        .push_raw(vec![0x82, 0x01])
        .build()?;
    assert_malformed(&bytes);
    Ok(())
}

#[test]
fn unknown_fragment_is_skipped() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut unknown = Vec::new();
    ciborium::into_writer(
        &Cbor::Array(vec![Cbor::Integer(77u8.into()), Cbor::Null]),
        &mut unknown,
    )?;
    let bytes = Block0Builder::new(Block0Date::from_secs(0))
        .push(&initial())?
        .push_raw(unknown)
        .push(&declaration()?)?
        .build()?;
    assert_eq!(scan_block0(&bytes)?.outputs.len(), 1);
    Ok(())
}
