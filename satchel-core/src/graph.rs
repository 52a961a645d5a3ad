//! Append-only DAG of transactions, edges meaning "spends output of".
//!
//! Nodes are keyed by txid. A node referenced only as an input source is
//! kept as a placeholder (no raw transaction) until its transaction is
//! ingested; such nodes are the graph's tails and drive ancestor backfill.

use bitcoin::{OutPoint, ScriptBuf, Transaction, Txid};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct TxNode {
    pub txid: Txid,
    pub tx: Option<Transaction>,
}

/// Per-transaction result of the fee/value propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeAndValue {
    /// `sum(inputs) - sum(outputs)`, defined only when every parent
    /// transaction is present in the graph.
    pub fee: Option<u64>,
    /// `sum(outputs to tracked) - sum(inputs from tracked)`. Inputs whose
    /// parent is missing contribute nothing.
    pub value: i64,
}

#[derive(Default)]
pub struct TxGraph {
    nodes: HashMap<Txid, TxNode>,
    spenders: HashMap<OutPoint, Txid>,
}

impl TxGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a transaction, creating placeholder nodes for unknown
    /// parents. Idempotent by txid.
    pub fn add_tx(&mut self, tx: Transaction) -> Txid {
        let txid = tx.compute_txid();

        for input in &tx.input {
            let prev = input.previous_output;
            if prev.is_null() {
                // coinbase
                continue;
            }
            self.nodes.entry(prev.txid).or_insert(TxNode {
                txid: prev.txid,
                tx: None,
            });
            self.spenders.insert(prev, txid);
        }

        let node = self.nodes.entry(txid).or_insert(TxNode { txid, tx: None });
        if node.tx.is_none() {
            node.tx = Some(tx);
        }

        txid
    }

    pub fn find_node(&self, txid: &Txid) -> Option<&TxNode> {
        self.nodes.get(txid)
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &TxNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes none of whose outputs are spent by a tracked transaction;
    /// the unspent-output candidates.
    pub fn heads(&self) -> Vec<&TxNode> {
        self.nodes
            .values()
            .filter(|node| {
                let Some(tx) = &node.tx else { return false };
                !(0..tx.output.len() as u32).any(|vout| {
                    self.spenders.contains_key(&OutPoint {
                        txid: node.txid,
                        vout,
                    })
                })
            })
            .collect()
    }

    /// Txids referenced as input sources whose transactions are missing;
    /// the ancestor-backfill candidates.
    pub fn tails(&self) -> Vec<Txid> {
        self.nodes
            .values()
            .filter(|node| node.tx.is_none())
            .map(|node| node.txid)
            .collect()
    }

    pub fn is_spent(&self, outpoint: &OutPoint) -> bool {
        self.spenders.contains_key(outpoint)
    }

    fn parents(&self, txid: &Txid) -> Vec<Txid> {
        match self.nodes.get(txid).and_then(|n| n.tx.as_ref()) {
            Some(tx) => tx
                .input
                .iter()
                .filter(|i| !i.previous_output.is_null())
                .map(|i| i.previous_output.txid)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Ancestor depth of every node: the longest chain of parents above
    /// it. A transaction always carries a strictly smaller depth than
    /// anything that spends it, so sorting by depth (with any tiebreak)
    /// never places a spender before its funding transaction.
    pub fn depths(&self) -> HashMap<Txid, usize> {
        let mut memo = HashMap::new();
        for txid in self.nodes.keys() {
            self.depth_of(txid, &mut memo);
        }
        memo
    }

    fn depth_of(&self, txid: &Txid, memo: &mut HashMap<Txid, usize>) -> usize {
        if let Some(depth) = memo.get(txid) {
            return *depth;
        }

        let depth = self
            .parents(txid)
            .iter()
            .map(|parent| self.depth_of(parent, memo) + 1)
            .max()
            .unwrap_or(0);
        memo.insert(*txid, depth);
        depth
    }

    /// One propagation pass over every materialized node, netting each
    /// transaction against the tracked script set.
    pub fn fees_and_values(&self, tracked: &HashSet<ScriptBuf>) -> HashMap<Txid, FeeAndValue> {
        let mut results = HashMap::new();

        for node in self.nodes.values() {
            let Some(tx) = &node.tx else { continue };

            let out_total: u64 = tx.output.iter().map(|o| o.value.to_sat()).sum();
            let out_tracked: u64 = tx
                .output
                .iter()
                .filter(|o| tracked.contains(&o.script_pubkey))
                .map(|o| o.value.to_sat())
                .sum();

            let mut in_total = 0u64;
            let mut in_tracked = 0u64;
            let mut all_parents_known = true;

            for input in &tx.input {
                let prev = input.previous_output;
                if prev.is_null() {
                    all_parents_known = false;
                    continue;
                }

                let parent_out = self
                    .nodes
                    .get(&prev.txid)
                    .and_then(|n| n.tx.as_ref())
                    .and_then(|parent| parent.output.get(prev.vout as usize));

                match parent_out {
                    Some(out) => {
                        in_total += out.value.to_sat();
                        if tracked.contains(&out.script_pubkey) {
                            in_tracked += out.value.to_sat();
                        }
                    }
                    None => all_parents_known = false,
                }
            }

            let fee = all_parents_known.then(|| in_total.saturating_sub(out_total));
            let value = out_tracked as i64 - in_tracked as i64;

            results.insert(node.txid, FeeAndValue { fee, value });
        }

        results
    }
}
