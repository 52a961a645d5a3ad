//! Outgoing transaction construction: candidate enumeration, largest-first
//! coin selection, padded fee estimation, change handling and signing.

use crate::config::NetworkParams;
use crate::error::{Result, WalletError};
use crate::types::UnspentOutput;
use crate::wallet::Wallet;
use bitcoin::absolute::LockTime;
use bitcoin::address::NetworkUnchecked;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{
    Address, AddressType, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness,
};
use std::collections::HashMap;

/// Knobs for [`Wallet::create_tx`].
#[derive(Debug, Clone, Default)]
pub struct CreateTxOptions {
    /// Explicit fee in satoshis; when absent the fee is re-estimated from
    /// the transaction size after every added input.
    pub fee: Option<u64>,
    /// Minimum confirmations for spendable outputs; `None` means 1.
    pub min_conf: Option<u32>,
    /// Caller-supplied spend candidates; when absent the wallet's graph
    /// heads are enumerated.
    pub utxos: Option<Vec<UnspentOutput>>,
}

pub(crate) fn create_transaction(
    wallet: &Wallet,
    to: &str,
    value: u64,
    options: &CreateTxOptions,
) -> Result<Transaction> {
    let params = &wallet.params;
    let min_conf = options.min_conf.unwrap_or(1);

    let to_address = validate_destination(to, params)?;
    if value <= params.dust_threshold {
        return Err(WalletError::BelowDust {
            value,
            threshold: params.dust_threshold,
        });
    }

    let mut candidates = match &options.utxos {
        Some(utxos) => validate_utxos(utxos, min_conf)?,
        None => candidate_outputs(wallet, min_conf),
    };
    candidates.sort_by(|a, b| b.value.cmp(&a.value));

    let mut tx = Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: vec![],
        output: vec![TxOut {
            value: Amount::from_sat(value),
            script_pubkey: to_address.script_pubkey(),
        }],
    };

    let mut accum = 0u64;
    let mut needed = value;
    let mut selected: Vec<UnspentOutput> = Vec::new();

    for utxo in candidates {
        tx.input.push(TxIn {
            previous_output: OutPoint {
                txid: utxo.txid,
                vout: utxo.vout,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::default(),
        });
        accum += utxo.value;
        selected.push(utxo);

        let fee = match options.fee {
            Some(fee) => fee,
            None => estimate_fee_pad_change(&tx, params),
        };
        needed = value + fee;

        if accum >= needed {
            let change = accum - needed;
            if change > params.dust_threshold {
                tx.output.push(TxOut {
                    value: Amount::from_sat(change),
                    script_pubkey: wallet.next_change_address()?.script_pubkey(),
                });
            }
            break;
        }
    }

    if accum < needed {
        let zero_conf_total: u64 = match &options.utxos {
            Some(utxos) => utxos.iter().map(|u| u.value).sum(),
            None => candidate_outputs(wallet, 0).iter().map(|u| u.value).sum(),
        };
        return Err(WalletError::InsufficientFunds {
            has: accum,
            needed,
            pending: zero_conf_total >= needed,
        });
    }

    sign_inputs(wallet, tx, &selected)
}

fn validate_destination(to: &str, params: &NetworkParams) -> Result<Address> {
    let address = to
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| WalletError::invalid_address(format!("{}: {}", to, e)))?
        .require_network(params.network)
        .map_err(|_| {
            WalletError::invalid_address(format!("{} is not a {} address", to, params.network))
        })?;

    match address.address_type() {
        Some(AddressType::P2pkh) | Some(AddressType::P2sh) => Ok(address),
        _ => Err(WalletError::invalid_address(format!(
            "{} is not a pay-to-pubkey-hash or pay-to-script-hash address",
            to
        ))),
    }
}

/// Spendable outputs of sufficiently confirmed graph heads whose
/// destination is in the wallet's windows and not spent by any tracked
/// transaction.
fn candidate_outputs(wallet: &Wallet, min_conf: u32) -> Vec<UnspentOutput> {
    let window: HashMap<ScriptBuf, Address> = wallet
        .addresses
        .iter()
        .chain(wallet.change_addresses.iter())
        .map(|a| (a.script_pubkey(), a.clone()))
        .collect();

    let mut candidates = Vec::new();
    for node in wallet.graph.heads() {
        let Some(meta) = wallet.metadata.get(&node.txid) else {
            continue;
        };
        if meta.value.unwrap_or(0) <= 0 || meta.confirmations.unwrap_or(0) < min_conf {
            continue;
        }
        let Some(tx) = &node.tx else { continue };

        for (index, output) in tx.output.iter().enumerate() {
            let outpoint = OutPoint {
                txid: node.txid,
                vout: index as u32,
            };
            if wallet.graph.is_spent(&outpoint) {
                continue;
            }
            if let Some(address) = window.get(&output.script_pubkey) {
                candidates.push(UnspentOutput {
                    txid: node.txid,
                    vout: index as u32,
                    address: address.clone(),
                    value: output.value.to_sat(),
                    confirmations: meta.confirmations,
                });
            }
        }
    }

    candidates
}

fn validate_utxos(utxos: &[UnspentOutput], min_conf: u32) -> Result<Vec<UnspentOutput>> {
    for utxo in utxos {
        if utxo.value == 0 {
            return Err(WalletError::invalid_utxo(format!(
                "{}:{} has zero value",
                utxo.txid, utxo.vout
            )));
        }
        if utxo.confirmations.is_none() {
            return Err(WalletError::invalid_utxo(format!(
                "{}:{} is missing a confirmation count",
                utxo.txid, utxo.vout
            )));
        }
    }

    Ok(utxos
        .iter()
        .filter(|u| u.confirmations.unwrap_or(0) >= min_conf)
        .cloned()
        .collect())
}

/// Fee for the transaction-so-far padded with a soft-dust-sized change
/// output, so the estimate never undershoots the final shape.
fn estimate_fee_pad_change(tx: &Transaction, params: &NetworkParams) -> u64 {
    let mut padded = tx.clone();
    padded.output.push(TxOut {
        value: Amount::from_sat(params.dust_soft_threshold),
        script_pubkey: tx.output[0].script_pubkey.clone(),
    });
    params.estimate_fee(&padded)
}

/// Sign every input (legacy P2PKH, SIGHASH_ALL) with the key owning its
/// source address, in input order.
fn sign_inputs(wallet: &Wallet, mut tx: Transaction, selected: &[UnspentOutput]) -> Result<Transaction> {
    let secp = Secp256k1::new();
    let mut script_sigs = Vec::with_capacity(selected.len());

    {
        let cache = SighashCache::new(&tx);
        for (index, utxo) in selected.iter().enumerate() {
            let privkey = wallet.private_key_for(&utxo.address)?;
            let script_pubkey = utxo.address.script_pubkey();

            let sighash = cache
                .legacy_signature_hash(index, &script_pubkey, EcdsaSighashType::All.to_u32())
                .map_err(|e| WalletError::encoding(format!("Sighash failed: {}", e)))?;
            let message = Message::from_digest(sighash.to_byte_array());

            let signature = bitcoin::ecdsa::Signature {
                signature: secp.sign_ecdsa(&message, &privkey.inner),
                sighash_type: EcdsaSighashType::All,
            };
            let pubkey = privkey.public_key(&secp);

            let sig_bytes = PushBytesBuf::try_from(signature.to_vec())
                .map_err(|_| WalletError::encoding("Signature too long for script push"))?;
            script_sigs.push(
                Builder::new()
                    .push_slice(sig_bytes)
                    .push_key(&pubkey)
                    .into_script(),
            );
        }
    }

    for (input, script_sig) in tx.input.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }

    Ok(tx)
}
