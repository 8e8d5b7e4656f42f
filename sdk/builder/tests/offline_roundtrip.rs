//! Full air-gapped signing flow: stage on a watch-only device, encode,
//! transcribe, parse on the signer, attach keys, build.

use rand::rngs::OsRng;

use sable_builder::{MockProver, SignRequest, SpendIntent, TransactionBuilder};
use sable_privacy::{
    CommitmentScheme, Memo, MerklePath, MerkleTree, Note, NoteEncoding, NoteValue, SpendingKey,
};
use sable_transaction::{ActivationPolicy, Amount};

struct Wallet {
    sk: SpendingKey,
    note: Note,
    witness: MerklePath,
}

fn wallet_with_note(value: u64) -> Wallet {
    let scheme = CommitmentScheme::new();
    let mut tree = MerkleTree::new(CommitmentScheme::new());
    let sk = SpendingKey::random(&mut OsRng);
    let note = Note::random(sk.default_address(), NoteValue(value), &mut OsRng);
    let position = tree.insert(&note.commitment(&scheme));
    let witness = tree.path(position).unwrap();
    Wallet { sk, note, witness }
}

/// Watch-only builder with the wallet's note staged and one payment
/// intent, no key material anywhere.
fn staged_builder(wallet: &Wallet, payment: i64) -> TransactionBuilder {
    let mut builder = TransactionBuilder::new(&ActivationPolicy::regtest(), 100, None);
    assert!(builder.add_spend_raw(SpendIntent {
        note: wallet.note.clone(),
        witness: wallet.witness.clone(),
        encoding: NoteEncoding::V2,
        locator: None,
    }));
    let recipient = SpendingKey::random(&mut OsRng).default_address();
    assert!(builder.add_output_raw(
        recipient,
        Amount::from_raw(payment).unwrap(),
        Memo::empty()
    ));
    builder
}

#[test]
fn test_offline_flow_end_to_end() {
    let wallet = wallet_with_note(40_000);
    let online = staged_builder(&wallet, 25_000);

    let line = online.build_offline().unwrap();
    assert!(!line.contains('\n'));
    assert_eq!(line.split(' ').count(), 17);

    // what the signer receives
    let request = SignRequest::parse(&line).unwrap();
    assert_eq!(request.sender, wallet.sk.default_address().encode());
    assert_eq!(request.spends.len(), 1);
    assert_eq!(request.spends[0].value, 40_000);

    // 40000 - 25000 - 10000 fee leaves 5000 change back to the sender
    assert_eq!(request.outputs.len(), 2);
    assert_eq!(request.outputs[0].amount, 25_000);
    assert_eq!(request.outputs[1].amount, 5_000);
    assert_eq!(request.outputs[1].address, request.sender);

    // the signer attaches keys and runs the online build
    let mut signer = request.into_builder(None).unwrap();
    assert_eq!(signer.fee().raw(), 10_000);
    assert!(signer.convert_raw_spends(&wallet.sk));
    assert!(signer.convert_raw_outputs(&wallet.sk.expand().ovk));

    let result = signer.build(&MockProver::new());
    assert!(result.is_tx());
    let tx = result.into_tx();

    assert_eq!(tx.shielded_spends.len(), 1);
    assert_eq!(tx.shielded_outputs.len(), 2);
    assert_eq!(tx.value_balance.raw(), 10_000);
    assert_eq!(tx.vin.len(), 0);
    assert_eq!(tx.vout.len(), 0);
    assert!(tx.binding_sig.is_some());
    assert_eq!(tx.expiry_height, ActivationPolicy::regtest().expiry_height(100));
}

#[test]
fn test_reencoding_is_byte_identical() {
    let wallet = wallet_with_note(40_000);
    let line = staged_builder(&wallet, 25_000).build_offline().unwrap();

    // parse then re-encode
    let request = SignRequest::parse(&line).unwrap();
    assert_eq!(request.encode().unwrap(), line);

    // and through a reconstructed builder: change is already an
    // explicit output record, so nothing is appended twice
    let signer = request.into_builder(None).unwrap();
    assert_eq!(signer.build_offline().unwrap(), line);
}

#[test]
fn test_signer_rejects_foreign_spending_key() {
    let wallet = wallet_with_note(40_000);
    let line = staged_builder(&wallet, 25_000).build_offline().unwrap();

    let mut signer = SignRequest::parse(&line).unwrap().into_builder(None).unwrap();
    let wrong = SpendingKey::random(&mut OsRng);
    assert!(!signer.convert_raw_spends(&wrong));
    assert_eq!(signer.spend_intents().len(), 1);
}

#[test]
fn test_explicit_shielded_change_wins_over_sender() {
    let wallet = wallet_with_note(40_000);
    let mut online = staged_builder(&wallet, 25_000);

    let change_key = SpendingKey::random(&mut OsRng);
    online.send_change_to_shielded(change_key.default_address(), change_key.expand().ovk);

    let request = SignRequest::parse(&online.build_offline().unwrap()).unwrap();
    assert_eq!(request.outputs.len(), 2);
    assert_eq!(
        request.outputs[1].address,
        change_key.default_address().encode()
    );
    assert_ne!(request.outputs[1].address, request.sender);
}

#[test]
fn test_deficit_fails_encoding() {
    let wallet = wallet_with_note(40_000);
    // 40000 cannot cover 45000 plus the default fee
    let online = staged_builder(&wallet, 45_000);
    assert!(online.build_offline().is_err());
}

#[test]
fn test_memo_survives_the_wire() {
    let wallet = wallet_with_note(40_000);
    let mut online = TransactionBuilder::new(&ActivationPolicy::regtest(), 100, None);
    assert!(online.add_spend_raw(SpendIntent {
        note: wallet.note.clone(),
        witness: wallet.witness.clone(),
        encoding: NoteEncoding::V2,
        locator: None,
    }));
    let recipient = SpendingKey::random(&mut OsRng).default_address();
    assert!(online.add_output_raw(
        recipient,
        Amount::from_raw(25_000).unwrap(),
        Memo::from_text("invoice 1177").unwrap()
    ));

    let request = SignRequest::parse(&online.build_offline().unwrap()).unwrap();
    assert_eq!(request.outputs[0].memo.content(), b"invoice 1177");
    assert!(request.outputs[1].memo.is_empty());
}
