//! Transcription-fault coverage for the offline signing line: every
//! corrupted character must be caught before any field is trusted.

use rand::rngs::OsRng;

use sable_builder::{ProtocolError, SignRequest, SpendIntent, TransactionBuilder};
use sable_privacy::{
    CommitmentScheme, Memo, MerkleTree, Note, NoteEncoding, NoteValue, SpendingKey,
};
use sable_transaction::{ActivationPolicy, Amount};

fn sample_line() -> String {
    let scheme = CommitmentScheme::new();
    let mut tree = MerkleTree::new(CommitmentScheme::new());
    let sk = SpendingKey::random(&mut OsRng);
    let note = Note::random(sk.default_address(), NoteValue(40_000), &mut OsRng);
    let position = tree.insert(&note.commitment(&scheme));
    let witness = tree.path(position).unwrap();

    let mut builder = TransactionBuilder::new(&ActivationPolicy::regtest(), 100, None);
    assert!(builder.add_spend_raw(SpendIntent {
        note,
        witness,
        encoding: NoteEncoding::V2,
        locator: None,
    }));
    let recipient = SpendingKey::random(&mut OsRng).default_address();
    assert!(builder.add_output_raw(
        recipient,
        Amount::from_raw(25_000).unwrap(),
        Memo::from_text("rent").unwrap()
    ));
    builder.build_offline().unwrap()
}

/// Replace the trailing checksum with one derived from the (possibly
/// altered) field prefix, so the targeted field check is what fires.
fn reseal(fields: &[&str]) -> String {
    let mut msg = fields.join(" ");
    msg.push(' ');
    let checksum = 1 + msg.bytes().map(u64::from).sum::<u64>();
    msg.push_str(&checksum.to_string());
    msg
}

#[test]
fn test_every_single_character_corruption_is_rejected() {
    let line = sample_line();
    assert!(SignRequest::parse(&line).is_ok());

    for i in 0..line.len() {
        let mut bytes = line.clone().into_bytes();
        bytes[i] = if bytes[i] == b'x' { b'y' } else { b'x' };
        let corrupted = String::from_utf8(bytes).unwrap();
        assert!(
            SignRequest::parse(&corrupted).is_err(),
            "corruption at byte {i} went undetected"
        );
    }
}

#[test]
fn test_dropped_character_is_rejected() {
    let line = sample_line();
    for i in [0, 17, line.len() / 2, line.len() - 1] {
        let mut shortened = line.clone();
        shortened.remove(i);
        assert!(SignRequest::parse(&shortened).is_err());
    }
}

#[test]
fn test_garbage_lines_are_rejected() {
    for line in ["", " ", "z_sign_offline", "z_sign_offline sabl 1", "hello world"] {
        assert!(SignRequest::parse(line).is_err());
    }
}

#[test]
fn test_truncated_checksum_field_is_rejected() {
    let line = sample_line();
    let truncated = line.rsplit_once(' ').unwrap().0;
    assert!(SignRequest::parse(truncated).is_err());
}

#[test]
fn test_wrong_protocol_version_after_valid_checksum() {
    let line = sample_line();
    let mut fields: Vec<&str> = line.split(' ').collect();
    fields[2] = "9";
    assert_eq!(
        SignRequest::parse(&reseal(&fields[..16])),
        Err(ProtocolError::BadVersion("9".into()))
    );
}

#[test]
fn test_empty_spend_array_after_valid_checksum() {
    let line = sample_line();
    let mut fields: Vec<&str> = line.split(' ').collect();
    fields[4] = "'[]'";
    assert_eq!(
        SignRequest::parse(&reseal(&fields[..16])),
        Err(ProtocolError::EmptySpends)
    );
}

#[test]
fn test_malformed_spend_record_after_valid_checksum() {
    let line = sample_line();
    let mut fields: Vec<&str> = line.split(' ').collect();
    fields[4] = "'[{\"witnessposition\":\"5\"}]'";
    assert_eq!(
        SignRequest::parse(&reseal(&fields[..16])),
        Err(ProtocolError::BadField("witnesspath"))
    );
}

#[test]
fn test_short_anchor_after_valid_checksum() {
    let line = sample_line();
    let mut fields: Vec<&str> = line.split(' ').collect();
    fields[10] = "\"ABCD\"";
    assert_eq!(
        SignRequest::parse(&reseal(&fields[..16])),
        Err(ProtocolError::BadField("anchor"))
    );
}

#[test]
fn test_non_binary_flag_after_valid_checksum() {
    let line = sample_line();
    let mut fields: Vec<&str> = line.split(' ').collect();
    fields[11] = "2";
    assert_eq!(
        SignRequest::parse(&reseal(&fields[..16])),
        Err(ProtocolError::BadField("overwintered"))
    );
}

#[test]
fn test_pre_shielded_version_cannot_become_a_builder() {
    let line = sample_line();

    let mut request = SignRequest::parse(&line).unwrap();
    request.version = 3;
    assert_eq!(
        request.into_builder(None).map(|_| ()).unwrap_err(),
        ProtocolError::BadField("version")
    );

    let mut request = SignRequest::parse(&line).unwrap();
    request.overwintered = false;
    assert_eq!(
        request.into_builder(None).map(|_| ()).unwrap_err(),
        ProtocolError::BadField("version")
    );
}

#[test]
fn test_sender_mismatch_cannot_become_a_builder() {
    let line = sample_line();
    let mut request = SignRequest::parse(&line).unwrap();
    request.sender = SpendingKey::random(&mut OsRng).default_address().encode();
    assert_eq!(
        request.into_builder(None).map(|_| ()).unwrap_err(),
        ProtocolError::BadField("sender")
    );
}

#[test]
fn test_anchor_mismatch_cannot_become_a_builder() {
    let line = sample_line();
    let mut request = SignRequest::parse(&line).unwrap();
    request.anchor[0] ^= 1;
    assert_eq!(
        request.into_builder(None).map(|_| ()).unwrap_err(),
        ProtocolError::BadField("anchor")
    );
}

#[test]
fn test_witness_position_mismatch_cannot_become_a_builder() {
    let line = sample_line();
    let mut request = SignRequest::parse(&line).unwrap();
    request.spends[0].witness_position += 1;
    assert_eq!(
        request.into_builder(None).map(|_| ()).unwrap_err(),
        ProtocolError::BadField("witnessposition")
    );
}
