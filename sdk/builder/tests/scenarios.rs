//! End-to-end build scenarios: balance resolution, change precedence,
//! anchor consistency, and build atomicity.

use std::cell::Cell;
use std::sync::Arc;

use rand::rngs::OsRng;

use sable_builder::{
    Keystore, MemoryKeystore, MockProver, OutputProof, OutputProofInputs, ProverError,
    ShieldedProver, SpendIntent, SpendProof, SpendProofInputs, TransactionBuilder,
};
use sable_privacy::{
    CommitmentScheme, Memo, MerklePath, MerkleTree, Note, NoteEncoding, NoteValue, SpendingKey,
};
use sable_transaction::{ActivationPolicy, Amount, OutPoint, SpendDescription};

fn amount(value: i64) -> Amount {
    Amount::from_raw(value).unwrap()
}

fn online_builder(keystore: Option<Arc<dyn Keystore>>) -> TransactionBuilder {
    TransactionBuilder::new(&ActivationPolicy::regtest(), 100, keystore)
}

/// Mint a note to the key's default address and record it in the tree.
fn fund_note(
    sk: &SpendingKey,
    value: u64,
    tree: &mut MerkleTree,
    scheme: &CommitmentScheme,
) -> (Note, MerklePath) {
    let note = Note::random(sk.default_address(), NoteValue(value), &mut OsRng);
    let position = tree.insert(&note.commitment(scheme));
    (note, tree.path(position).unwrap())
}

struct CountingProver {
    inner: MockProver,
    calls: Cell<u32>,
}

impl CountingProver {
    fn new() -> Self {
        Self {
            inner: MockProver::new(),
            calls: Cell::new(0),
        }
    }

    fn bump(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl ShieldedProver for CountingProver {
    fn spend_proof(&self, inputs: &SpendProofInputs<'_>) -> Result<SpendProof, ProverError> {
        self.bump();
        self.inner.spend_proof(inputs)
    }

    fn output_proof(&self, inputs: &OutputProofInputs<'_>) -> Result<OutputProof, ProverError> {
        self.bump();
        self.inner.output_proof(inputs)
    }

    fn spend_auth_sig(
        &self,
        ask: &[u8; 32],
        alpha: &[u8; 32],
        sighash: &[u8; 32],
    ) -> Result<[u8; 64], ProverError> {
        self.bump();
        self.inner.spend_auth_sig(ask, alpha, sighash)
    }

    fn binding_sig(
        &self,
        value_balance: Amount,
        sighash: &[u8; 32],
    ) -> Result<[u8; 64], ProverError> {
        self.bump();
        self.inner.binding_sig(value_balance, sighash)
    }
}

#[test]
fn test_scenario_shielding() {
    // one transparent input of 50000, one shielded output of 40000,
    // default fee 10000: nothing left over
    let mut keystore = MemoryKeystore::new();
    let funding = keystore.generate_transparent(&mut OsRng);
    let mut builder = online_builder(Some(Arc::new(keystore)));

    builder.add_transparent_input(
        OutPoint {
            txid: [1u8; 32],
            index: 0,
        },
        funding.script_pubkey(),
        amount(50_000),
    );

    let sender = SpendingKey::random(&mut OsRng);
    let recipient = SpendingKey::random(&mut OsRng).default_address();
    assert!(builder.add_output(sender.expand().ovk, recipient, amount(40_000), Memo::empty()));

    let result = builder.build(&MockProver::new());
    assert!(result.is_tx());
    let tx = result.tx();

    assert_eq!(tx.vin.len(), 1);
    assert_eq!(tx.vout.len(), 0);
    assert_eq!(tx.shielded_spends.len(), 0);
    assert_eq!(tx.shielded_outputs.len(), 1);
    assert_eq!(tx.value_balance.raw(), -40_000);
    assert!(tx.binding_sig.is_some());
    assert!(!tx.vin[0].script_sig.is_empty());
}

#[test]
fn test_scenario_shielded_spend_with_self_change() {
    // spend 40000, pay 25000, fee 10000: 5000 goes back to the
    // spender as a second output
    let scheme = CommitmentScheme::new();
    let mut tree = MerkleTree::new(CommitmentScheme::new());
    let sk = SpendingKey::random(&mut OsRng);
    let (note, witness) = fund_note(&sk, 40_000, &mut tree, &scheme);

    let mut builder = online_builder(None);
    assert!(builder.add_spend(sk.expand(), note, witness));

    let recipient = SpendingKey::random(&mut OsRng).default_address();
    assert!(builder.add_output(sk.expand().ovk, recipient, amount(25_000), Memo::empty()));

    let result = builder.build(&MockProver::new());
    assert!(result.is_tx());
    let tx = result.into_tx();

    assert_eq!(tx.shielded_spends.len(), 1);
    assert_eq!(tx.shielded_outputs.len(), 2);
    assert_eq!(tx.value_balance.raw(), 10_000);
    assert_eq!(tx.vin.len(), 0);
    assert_eq!(tx.vout.len(), 0);
}

#[test]
fn test_scenario_insufficient_funds() {
    // explicit fee 60000 against 90000 total and a 60000 output
    let scheme = CommitmentScheme::new();
    let mut tree = MerkleTree::new(CommitmentScheme::new());
    let sk = SpendingKey::random(&mut OsRng);
    let (note, witness) = fund_note(&sk, 90_000, &mut tree, &scheme);

    let mut builder = online_builder(None);
    assert!(builder.add_spend(sk.expand(), note, witness));
    let recipient = SpendingKey::random(&mut OsRng).default_address();
    assert!(builder.add_output(sk.expand().ovk, recipient, amount(60_000), Memo::empty()));
    builder.set_fee(amount(60_000));

    let result = builder.build(&MockProver::new());
    assert!(!result.is_tx());
    assert_eq!(result.error(), "change cannot be negative");
}

#[test]
fn test_value_conservation() {
    // transparent 50000 in, 20000 out; shielded 40000 in, 30000 out;
    // fee 10000; 30000 change to an explicit shielded address
    let scheme = CommitmentScheme::new();
    let mut tree = MerkleTree::new(CommitmentScheme::new());
    let sk = SpendingKey::random(&mut OsRng);
    let (note, witness) = fund_note(&sk, 40_000, &mut tree, &scheme);

    let mut keystore = MemoryKeystore::new();
    let funding = keystore.generate_transparent(&mut OsRng);
    let payee = keystore.generate_transparent(&mut OsRng);
    let mut builder = online_builder(Some(Arc::new(keystore)));

    builder.add_transparent_input(
        OutPoint {
            txid: [2u8; 32],
            index: 1,
        },
        funding.script_pubkey(),
        amount(50_000),
    );
    assert!(builder.add_transparent_output(&payee.encode(), amount(20_000)));
    assert!(builder.add_spend(sk.expand(), note, witness));

    let recipient = SpendingKey::random(&mut OsRng).default_address();
    assert!(builder.add_output(sk.expand().ovk, recipient, amount(30_000), Memo::empty()));

    let change_key = SpendingKey::random(&mut OsRng);
    builder.send_change_to_shielded(change_key.default_address(), change_key.expand().ovk);

    let result = builder.build(&MockProver::new());
    assert!(result.is_tx());
    let tx = result.into_tx();

    // transparent in = transparent out + fee - value_balance
    let transparent_out: i64 = tx.vout.iter().map(|o| o.value.raw()).sum();
    assert_eq!(tx.shielded_outputs.len(), 2);
    assert_eq!(tx.value_balance.raw(), 40_000 - 30_000 - 30_000);
    assert_eq!(50_000, transparent_out + 10_000 - tx.value_balance.raw());
}

#[test]
fn test_change_requires_a_destination() {
    // transparent-only funding with surplus but no spend to fall back
    // on and no explicit change address
    let mut keystore = MemoryKeystore::new();
    let funding = keystore.generate_transparent(&mut OsRng);
    let mut builder = online_builder(Some(Arc::new(keystore)));

    builder.add_transparent_input(
        OutPoint {
            txid: [3u8; 32],
            index: 0,
        },
        funding.script_pubkey(),
        amount(50_000),
    );
    let sender = SpendingKey::random(&mut OsRng);
    let recipient = SpendingKey::random(&mut OsRng).default_address();
    assert!(builder.add_output(sender.expand().ovk, recipient, amount(20_000), Memo::empty()));

    let result = builder.build(&MockProver::new());
    assert!(!result.is_tx());
    assert_eq!(result.error(), "could not determine change address");
}

#[test]
fn test_anchor_mismatch_leaves_spends_untouched() {
    let scheme = CommitmentScheme::new();
    let sk = SpendingKey::random(&mut OsRng);

    let mut tree_a = MerkleTree::new(CommitmentScheme::new());
    let (note_a, witness_a) = fund_note(&sk, 40_000, &mut tree_a, &scheme);

    let mut tree_b = MerkleTree::new(CommitmentScheme::new());
    let (note_b, witness_b) = fund_note(&sk, 30_000, &mut tree_b, &scheme);

    let mut builder = online_builder(None);
    assert!(builder.add_spend(sk.expand(), note_a.clone(), witness_a));
    let anchor_before = builder.spends()[0].anchor;

    assert!(!builder.add_spend(sk.expand(), note_b, witness_b));
    assert_eq!(builder.spends().len(), 1);
    assert_eq!(builder.spends()[0].note, note_a);
    assert_eq!(builder.spends()[0].anchor, anchor_before);
}

#[test]
fn test_negative_change_never_reaches_the_prover() {
    let scheme = CommitmentScheme::new();
    let mut tree = MerkleTree::new(CommitmentScheme::new());
    let sk = SpendingKey::random(&mut OsRng);
    let (note, witness) = fund_note(&sk, 15_000, &mut tree, &scheme);

    let mut builder = online_builder(None);
    assert!(builder.add_spend(sk.expand(), note, witness));
    let recipient = SpendingKey::random(&mut OsRng).default_address();
    assert!(builder.add_output(sk.expand().ovk, recipient, amount(20_000), Memo::empty()));

    let prover = CountingProver::new();
    let result = builder.build(&prover);
    assert!(!result.is_tx());
    assert_eq!(prover.calls.get(), 0);
}

#[test]
#[should_panic(expected = "shielded components require transaction version")]
fn test_version_gate_on_outputs() {
    // mainnet height 100 predates every shielded upgrade
    let mut builder = TransactionBuilder::new(&ActivationPolicy::mainnet(), 100, None);
    let sender = SpendingKey::random(&mut OsRng);
    let recipient = SpendingKey::random(&mut OsRng).default_address();
    builder.add_output(sender.expand().ovk, recipient, amount(1_000), Memo::empty());
}

#[test]
#[should_panic(expected = "shielded components require transaction version")]
fn test_version_gate_on_raw_spends() {
    let mut builder = TransactionBuilder::new(&ActivationPolicy::mainnet(), 100, None);
    let sk = SpendingKey::random(&mut OsRng);
    let note = Note::random(sk.default_address(), NoteValue(1_000), &mut OsRng);
    builder.add_spend_raw(SpendIntent {
        note,
        witness: MerklePath {
            siblings: vec![[0u8; 32]; 32],
            position: 0,
        },
        encoding: NoteEncoding::V2,
        locator: None,
    });
}

#[test]
fn test_unconverted_intents_block_the_build() {
    let scheme = CommitmentScheme::new();
    let mut tree = MerkleTree::new(CommitmentScheme::new());
    let sk = SpendingKey::random(&mut OsRng);
    let (note, witness) = fund_note(&sk, 40_000, &mut tree, &scheme);

    let mut builder = online_builder(None);
    assert!(builder.add_spend_raw(SpendIntent {
        note,
        witness,
        encoding: NoteEncoding::V2,
        locator: None,
    }));

    let result = builder.build(&MockProver::new());
    assert!(!result.is_tx());
    assert_eq!(result.error(), "raw spends or outputs remain unconverted");
}

#[test]
fn test_conversion_is_atomic() {
    let scheme = CommitmentScheme::new();
    let mut tree = MerkleTree::new(CommitmentScheme::new());
    let sk = SpendingKey::random(&mut OsRng);
    let (note, witness) = fund_note(&sk, 40_000, &mut tree, &scheme);

    let mut builder = online_builder(None);
    assert!(builder.add_spend_raw(SpendIntent {
        note,
        witness,
        encoding: NoteEncoding::V2,
        locator: None,
    }));

    // wrong key: nothing converts, the intent stays staged
    let wrong = SpendingKey::random(&mut OsRng);
    assert!(!builder.convert_raw_spends(&wrong));
    assert_eq!(builder.spend_intents().len(), 1);
    assert_eq!(builder.spends().len(), 0);

    // right key: the intent becomes a keyed spend
    assert!(builder.convert_raw_spends(&sk));
    assert_eq!(builder.spend_intents().len(), 0);
    assert_eq!(builder.spends().len(), 1);
}

#[test]
fn test_second_sender_rejected_for_raw_spends() {
    let scheme = CommitmentScheme::new();
    let mut tree = MerkleTree::new(CommitmentScheme::new());
    let sk_a = SpendingKey::random(&mut OsRng);
    let sk_b = SpendingKey::random(&mut OsRng);
    let (note_a, witness_a) = fund_note(&sk_a, 40_000, &mut tree, &scheme);
    let (note_b, witness_b) = fund_note(&sk_b, 30_000, &mut tree, &scheme);

    let mut builder = online_builder(None);
    assert!(builder.add_spend_raw(SpendIntent {
        note: note_a,
        witness: witness_a,
        encoding: NoteEncoding::V2,
        locator: None,
    }));
    assert!(!builder.add_spend_raw(SpendIntent {
        note: note_b,
        witness: witness_b,
        encoding: NoteEncoding::V2,
        locator: None,
    }));
    assert_eq!(builder.spend_intents().len(), 1);
}

#[test]
fn test_aux_payload_is_flushed_last() {
    let mut keystore = MemoryKeystore::new();
    let funding = keystore.generate_transparent(&mut OsRng);
    let payee = keystore.generate_transparent(&mut OsRng);
    let mut builder = online_builder(Some(Arc::new(keystore)));

    builder.add_transparent_input(
        OutPoint {
            txid: [4u8; 32],
            index: 0,
        },
        funding.script_pubkey(),
        amount(30_000),
    );
    assert!(builder.add_transparent_output(&payee.encode(), amount(20_000)));
    builder.set_aux_data(b"notary checkpoint".to_vec());

    let result = builder.build(&MockProver::new());
    assert!(result.is_tx());
    let tx = result.into_tx();

    assert_eq!(tx.vout.len(), 2);
    let aux = &tx.vout[1];
    assert_eq!(aux.value.raw(), 0);
    assert_eq!(aux.script_pubkey.as_bytes()[0], 0x6a);
    assert_eq!(&aux.script_pubkey.as_bytes()[1..], b"notary checkpoint");
}

#[test]
fn test_builder_at_maximum_height() {
    let builder = TransactionBuilder::new(&ActivationPolicy::regtest(), u32::MAX, None);
    assert_eq!(builder.height(), u32::MAX);
    assert_eq!(builder.output_encoding(), NoteEncoding::V2);
}

#[test]
fn test_invalid_transparent_destination_is_non_fatal() {
    let mut builder = online_builder(None);
    assert!(!builder.add_transparent_output("not-an-address", amount(1_000)));
}

#[test]
fn test_spend_descriptions_share_the_anchor() {
    let scheme = CommitmentScheme::new();
    let mut tree = MerkleTree::new(CommitmentScheme::new());
    let sk = SpendingKey::random(&mut OsRng);

    let note_a = Note::random(sk.default_address(), NoteValue(20_000), &mut OsRng);
    let note_b = Note::random(sk.default_address(), NoteValue(30_000), &mut OsRng);
    let pos_a = tree.insert(&note_a.commitment(&scheme));
    let pos_b = tree.insert(&note_b.commitment(&scheme));
    let witness_a = tree.path(pos_a).unwrap();
    let witness_b = tree.path(pos_b).unwrap();

    let mut builder = online_builder(None);
    assert!(builder.add_spend(sk.expand(), note_a, witness_a));
    assert!(builder.add_spend(sk.expand(), note_b, witness_b));

    let recipient = SpendingKey::random(&mut OsRng).default_address();
    assert!(builder.add_output(sk.expand().ovk, recipient, amount(40_000), Memo::empty()));

    let result = builder.build(&MockProver::new());
    assert!(result.is_tx());
    let tx = result.into_tx();

    let anchors: Vec<[u8; 32]> = tx.shielded_spends.iter().map(|s: &SpendDescription| s.anchor).collect();
    assert_eq!(anchors.len(), 2);
    assert_eq!(anchors[0], anchors[1]);
    // distinct notes leave distinct nullifiers
    assert_ne!(tx.shielded_spends[0].nullifier, tx.shielded_spends[1].nullifier);
}
