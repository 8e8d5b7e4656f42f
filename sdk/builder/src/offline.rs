//! Offline Signing Protocol
//!
//! Serializes an entire unsigned build context into one newline-free,
//! space-delimited ASCII line so it can be transcribed to an
//! air-gapped signer, and reconstructs an equivalent builder from such
//! a line.
//!
//! ```text
//! z_sign_offline sabl 1 "<sender>" '[<spends>]' '[<outputs>]'
//! <minconf> <fee> <height> <branch_id> "<anchor>" <overwintered>
//! <expiry> <version_group_id> <version> <zip212> <checksum>
//! ```
//!
//! The trailing checksum is `1 + Σ ord(c)` over every character
//! preceding it (including the final field-terminating space). It
//! guards against manual transcription slips only; it is not an
//! authentication mechanism, and changing its properties requires a
//! new protocol version tag.

use std::sync::Arc;

use sable_privacy::{
    CommitmentScheme, Diversifier, Memo, MerklePath, Note, NoteEncoding, NoteValue, PaymentAddress,
};
use sable_transaction::{Amount, SHIELDED_TX_VERSION, TxFormat};

use crate::builder::TransactionBuilder;
use crate::error::ProtocolError;
use crate::keystore::Keystore;
use crate::staging::SpendIntent;

pub const PROTOCOL_TAG: &str = "z_sign_offline";
pub const COIN_TAG: &str = "sabl";
pub const PROTOCOL_VERSION: u32 = 1;

/// Space-separated fields per message, checksum included.
const FIELD_COUNT: usize = 17;

/// One staged spend on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendRecord {
    pub witness_position: u64,
    /// Serialized authentication path, [`sable_privacy::MERKLE_PATH_SIZE`] bytes.
    pub witness_path: Vec<u8>,
    pub note_d: [u8; 11],
    pub note_pkd: [u8; 32],
    pub note_r: [u8; 32],
    pub value: u64,
    /// Lead-byte epoch of the note being spent.
    pub encoding_v2: bool,
}

/// One staged output on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub address: String,
    pub amount: u64,
    pub memo: Memo,
}

/// A complete unsigned build context in transcribable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub sender: String,
    pub spends: Vec<SpendRecord>,
    pub outputs: Vec<OutputRecord>,
    pub min_confirmations: u32,
    pub fee: u64,
    pub height: u32,
    pub branch_id: u32,
    pub anchor: [u8; 32],
    pub overwintered: bool,
    pub expiry_height: u32,
    pub version_group_id: u32,
    pub version: u32,
    /// Plaintext encoding for outputs this transaction will create.
    pub encoding_v2: bool,
}

impl SignRequest {
    /// Capture a builder's staged, key-free state.
    ///
    /// Surplus value is returned to the explicit shielded change
    /// address if one is configured, otherwise to the sender, as an
    /// extra output record; a deficit fails encoding.
    pub fn from_builder(builder: &TransactionBuilder) -> Result<Self, ProtocolError> {
        let intents = builder.spend_intents();
        let Some(first) = intents.first() else {
            return Err(ProtocolError::EmptySpends);
        };

        let scheme = CommitmentScheme::new();
        let anchor = first
            .witness
            .root(&scheme, &first.note.commitment(&scheme));

        let spends = intents.iter().map(spend_record).collect();

        let mut outputs: Vec<OutputRecord> = builder
            .output_intents()
            .iter()
            .map(|intent| OutputRecord {
                address: intent.address.encode(),
                amount: intent.value.raw() as u64,
                memo: intent.memo.clone(),
            })
            .collect();

        let change = staged_change(builder)?;
        if change > 0 {
            let change_address = builder
                .shielded_change_address()
                .copied()
                .unwrap_or(*first.sender());
            outputs.push(OutputRecord {
                address: change_address.encode(),
                amount: change as u64,
                memo: Memo::empty(),
            });
        }

        let fee = u64::try_from(builder.fee().raw()).map_err(|_| ProtocolError::ValueOutOfRange)?;
        let format = builder.format();

        Ok(Self {
            sender: first.sender().encode(),
            spends,
            outputs,
            min_confirmations: builder.min_confirmations(),
            fee,
            height: builder.height(),
            branch_id: builder.branch_id(),
            anchor,
            overwintered: format.overwintered,
            expiry_height: builder.expiry_height(),
            version_group_id: format.version_group_id,
            version: format.version,
            encoding_v2: builder.output_encoding() == NoteEncoding::V2,
        })
    }

    /// Render the command line.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        if self.spends.is_empty() {
            return Err(ProtocolError::EmptySpends);
        }

        let mut msg = String::with_capacity(512);
        msg.push_str(PROTOCOL_TAG);
        msg.push(' ');
        msg.push_str(COIN_TAG);
        msg.push(' ');
        msg.push_str(&PROTOCOL_VERSION.to_string());
        msg.push(' ');

        msg.push('"');
        msg.push_str(&self.sender);
        msg.push_str("\" '[");
        for (i, spend) in self.spends.iter().enumerate() {
            if i > 0 {
                msg.push(',');
            }
            encode_spend(&mut msg, spend);
        }
        msg.push_str("]' '[");
        for (i, output) in self.outputs.iter().enumerate() {
            if i > 0 {
                msg.push(',');
            }
            encode_output(&mut msg, output);
        }
        msg.push_str("]' ");

        msg.push_str(&self.min_confirmations.to_string());
        msg.push(' ');
        msg.push_str(&self.fee.to_string());
        msg.push(' ');
        msg.push_str(&self.height.to_string());
        msg.push(' ');
        msg.push_str(&self.branch_id.to_string());
        msg.push_str(" \"");
        msg.push_str(&hex::encode_upper(self.anchor));
        msg.push_str("\" ");
        msg.push_str(if self.overwintered { "1" } else { "0" });
        msg.push(' ');
        msg.push_str(&self.expiry_height.to_string());
        msg.push(' ');
        msg.push_str(&self.version_group_id.to_string());
        msg.push(' ');
        msg.push_str(&self.version.to_string());
        msg.push(' ');
        msg.push_str(if self.encoding_v2 { "1" } else { "0" });
        msg.push(' ');

        let checksum = transcription_checksum(&msg);
        msg.push_str(&checksum.to_string());
        Ok(msg)
    }

    /// Parse a received command line, verifying the checksum over the
    /// exact characters received.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let last_space = line.rfind(' ').ok_or(ProtocolError::BadFieldCount {
            expected: FIELD_COUNT,
            found: 1,
        })?;
        let prefix = &line[..last_space + 1];
        let received: u64 = line[last_space + 1..]
            .parse()
            .map_err(|_| ProtocolError::BadField("checksum"))?;
        let derived = transcription_checksum(prefix);
        if received != derived {
            return Err(ProtocolError::BadChecksum { received, derived });
        }

        let tokens: Vec<&str> = line.split(' ').collect();
        if tokens.len() != FIELD_COUNT {
            return Err(ProtocolError::BadFieldCount {
                expected: FIELD_COUNT,
                found: tokens.len(),
            });
        }

        if tokens[0] != PROTOCOL_TAG || tokens[1] != COIN_TAG {
            return Err(ProtocolError::BadTag);
        }
        if tokens[2] != PROTOCOL_VERSION.to_string() {
            return Err(ProtocolError::BadVersion(tokens[2].to_string()));
        }

        let sender = unquote(tokens[3], '"').ok_or(ProtocolError::BadField("sender"))?;
        let spends_body = unwrap_array(tokens[4]).ok_or(ProtocolError::BadField("spends"))?;
        let outputs_body = unwrap_array(tokens[5]).ok_or(ProtocolError::BadField("outputs"))?;

        let spends = split_records(spends_body)
            .ok_or(ProtocolError::BadField("spends"))?
            .iter()
            .map(|record| parse_spend(record))
            .collect::<Result<Vec<_>, _>>()?;
        if spends.is_empty() {
            return Err(ProtocolError::EmptySpends);
        }
        let outputs = split_records(outputs_body)
            .ok_or(ProtocolError::BadField("outputs"))?
            .iter()
            .map(|record| parse_output(record))
            .collect::<Result<Vec<_>, _>>()?;

        let min_confirmations = parse_int(tokens[6], "minconf")?;
        let fee = parse_int(tokens[7], "fee")?;
        let height = parse_int(tokens[8], "height")?;
        let branch_id = parse_int(tokens[9], "branch_id")?;

        let anchor_hex = unquote(tokens[10], '"').ok_or(ProtocolError::BadField("anchor"))?;
        let anchor = fixed_hex::<32>(anchor_hex).ok_or(ProtocolError::BadField("anchor"))?;

        let overwintered = parse_flag(tokens[11], "overwintered")?;
        let expiry_height = parse_int(tokens[12], "expiry")?;
        let version_group_id = parse_int(tokens[13], "version_group_id")?;
        let version = parse_int(tokens[14], "version")?;
        let encoding_v2 = parse_flag(tokens[15], "zip212")?;

        Ok(Self {
            sender: sender.to_string(),
            spends,
            outputs,
            min_confirmations,
            fee,
            height,
            branch_id,
            anchor,
            overwintered,
            expiry_height,
            version_group_id,
            version,
            encoding_v2,
        })
    }

    /// Reconstruct a builder with the wire's version flags, ready for
    /// key attachment and an online build on the signing device.
    pub fn into_builder(
        self,
        keystore: Option<Arc<dyn Keystore>>,
    ) -> Result<TransactionBuilder, ProtocolError> {
        if !self.overwintered || self.version < SHIELDED_TX_VERSION {
            return Err(ProtocolError::BadField("version"));
        }

        let format = TxFormat {
            overwintered: self.overwintered,
            version: self.version,
            version_group_id: self.version_group_id,
        };
        let output_encoding = if self.encoding_v2 {
            NoteEncoding::V2
        } else {
            NoteEncoding::V1
        };
        let mut builder = TransactionBuilder::from_parts(
            format,
            self.branch_id,
            self.height,
            self.expiry_height,
            output_encoding,
            keystore,
        );

        let fee = Amount::from_u64(self.fee).map_err(|_| ProtocolError::BadField("fee"))?;
        builder.set_fee(fee);
        builder.set_min_confirmations(self.min_confirmations);

        let sender =
            PaymentAddress::parse(&self.sender).map_err(|_| ProtocolError::BadField("sender"))?;

        let scheme = CommitmentScheme::new();
        for (i, record) in self.spends.iter().enumerate() {
            let witness = MerklePath::decode(&record.witness_path)
                .map_err(|_| ProtocolError::BadField("witnesspath"))?;
            if witness.position != record.witness_position {
                return Err(ProtocolError::BadField("witnessposition"));
            }
            let recipient = PaymentAddress {
                diversifier: Diversifier(record.note_d),
                pk_d: record.note_pkd,
            };
            if recipient != sender {
                return Err(ProtocolError::BadField("sender"));
            }
            let note = Note::new(recipient, NoteValue(record.value), record.note_r);
            // the shared anchor on the wire must match the witnesses;
            // later records are checked against the first at conversion
            if i == 0 && witness.root(&scheme, &note.commitment(&scheme)) != self.anchor {
                return Err(ProtocolError::BadField("anchor"));
            }
            let accepted = builder.add_spend_raw(SpendIntent {
                note,
                witness,
                encoding: if record.encoding_v2 {
                    NoteEncoding::V2
                } else {
                    NoteEncoding::V1
                },
                locator: None,
            });
            if !accepted {
                return Err(ProtocolError::BadField("spends"));
            }
        }

        for record in &self.outputs {
            let address = PaymentAddress::parse(&record.address)
                .map_err(|_| ProtocolError::BadField("address"))?;
            let amount =
                Amount::from_u64(record.amount).map_err(|_| ProtocolError::BadField("amount"))?;
            if !builder.add_output_raw(address, amount, record.memo.clone()) {
                return Err(ProtocolError::BadField("amount"));
            }
        }

        Ok(builder)
    }
}

fn spend_record(intent: &SpendIntent) -> SpendRecord {
    SpendRecord {
        witness_position: intent.witness.position,
        witness_path: intent.witness.encode(),
        note_d: intent.note.recipient.diversifier.0,
        note_pkd: intent.note.recipient.pk_d,
        note_r: intent.note.rcm,
        value: intent.note.value.raw(),
        encoding_v2: intent.encoding == NoteEncoding::V2,
    }
}

/// Staged surplus before key material exists: spend intents plus
/// transparent inputs, minus output intents, transparent outputs, and
/// the fee.
fn staged_change(builder: &TransactionBuilder) -> Result<i64, ProtocolError> {
    let mut change: i64 = 0;
    for intent in builder.spend_intents() {
        let value =
            i64::try_from(intent.note.value.raw()).map_err(|_| ProtocolError::ValueOutOfRange)?;
        change = change
            .checked_add(value)
            .ok_or(ProtocolError::ValueOutOfRange)?;
    }
    for input in builder.transparent_inputs() {
        change = change
            .checked_add(input.value.raw())
            .ok_or(ProtocolError::ValueOutOfRange)?;
    }
    for intent in builder.output_intents() {
        change = change
            .checked_sub(intent.value.raw())
            .ok_or(ProtocolError::ValueOutOfRange)?;
    }
    for output in builder.transparent_outputs() {
        change = change
            .checked_sub(output.value.raw())
            .ok_or(ProtocolError::ValueOutOfRange)?;
    }
    change = change
        .checked_sub(builder.fee().raw())
        .ok_or(ProtocolError::ValueOutOfRange)?;
    if change < 0 {
        return Err(ProtocolError::ValueOutOfRange);
    }
    Ok(change)
}

fn transcription_checksum(message: &str) -> u64 {
    1 + message.bytes().map(u64::from).sum::<u64>()
}

fn encode_spend(msg: &mut String, spend: &SpendRecord) {
    msg.push_str("{\"witnessposition\":\"");
    msg.push_str(&spend.witness_position.to_string());
    msg.push_str("\",\"witnesspath\":\"");
    msg.push_str(&hex::encode_upper(&spend.witness_path));
    msg.push_str("\",\"note_d\":\"");
    msg.push_str(&hex::encode_upper(spend.note_d));
    msg.push_str("\",\"note_pkd\":\"");
    msg.push_str(&hex::encode_upper(spend.note_pkd));
    msg.push_str("\",\"note_r\":\"");
    msg.push_str(&hex::encode_upper(spend.note_r));
    msg.push_str("\",\"value\":");
    msg.push_str(&spend.value.to_string());
    msg.push_str(",\"zip212\":");
    msg.push_str(if spend.encoding_v2 { "1" } else { "0" });
    msg.push('}');
}

fn encode_output(msg: &mut String, output: &OutputRecord) {
    msg.push_str("{\"address\":\"");
    msg.push_str(&output.address);
    msg.push_str("\",\"amount\":");
    msg.push_str(&output.amount.to_string());
    if !output.memo.is_empty() {
        msg.push_str(",\"memo\":\"");
        msg.push_str(&output.memo.to_hex());
        msg.push('"');
    }
    msg.push('}');
}

fn parse_spend(record: &str) -> Result<SpendRecord, ProtocolError> {
    let witness_position = str_field(record, "witnessposition")
        .and_then(|s| s.parse().ok())
        .ok_or(ProtocolError::BadField("witnessposition"))?;
    let witness_path = str_field(record, "witnesspath")
        .and_then(|s| hex::decode(s).ok())
        .filter(|bytes| bytes.len() == sable_privacy::MERKLE_PATH_SIZE)
        .ok_or(ProtocolError::BadField("witnesspath"))?;
    let note_d = str_field(record, "note_d")
        .and_then(fixed_hex::<11>)
        .ok_or(ProtocolError::BadField("note_d"))?;
    let note_pkd = str_field(record, "note_pkd")
        .and_then(fixed_hex::<32>)
        .ok_or(ProtocolError::BadField("note_pkd"))?;
    let note_r = str_field(record, "note_r")
        .and_then(fixed_hex::<32>)
        .ok_or(ProtocolError::BadField("note_r"))?;
    let value = num_field(record, "value")
        .and_then(|s| s.parse().ok())
        .ok_or(ProtocolError::BadField("value"))?;
    let encoding_v2 = match num_field(record, "zip212") {
        Some("0") => false,
        Some("1") => true,
        _ => return Err(ProtocolError::BadField("zip212")),
    };

    Ok(SpendRecord {
        witness_position,
        witness_path,
        note_d,
        note_pkd,
        note_r,
        value,
        encoding_v2,
    })
}

fn parse_output(record: &str) -> Result<OutputRecord, ProtocolError> {
    let address = str_field(record, "address")
        .ok_or(ProtocolError::BadField("address"))?
        .to_string();
    let amount = num_field(record, "amount")
        .and_then(|s| s.parse().ok())
        .ok_or(ProtocolError::BadField("amount"))?;
    let memo = match str_field(record, "memo") {
        Some(hex_memo) => {
            Memo::from_hex(hex_memo).map_err(|_| ProtocolError::BadField("memo"))?
        }
        None => Memo::empty(),
    };

    Ok(OutputRecord {
        address,
        amount,
        memo,
    })
}

fn unquote(token: &str, quote: char) -> Option<&str> {
    token
        .strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
}

/// Strip the `'[` ... `]'` wrapper around an array field.
fn unwrap_array(token: &str) -> Option<&str> {
    unquote(token, '\'')?
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
}

/// Split a flat object array body into individual `{...}` records.
/// Records never nest, so splitting on the object boundary is exact.
fn split_records(body: &str) -> Option<Vec<&str>> {
    if body.is_empty() {
        return Some(Vec::new());
    }
    let inner = body
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))?;
    Some(inner.split("},{").collect())
}

/// Extract a quoted field value from a flat record body.
fn str_field<'a>(record: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("\"{key}\":\"");
    let start = record.find(&needle)? + needle.len();
    let end = record[start..].find('"')? + start;
    Some(&record[start..end])
}

/// Extract an unquoted numeric field value from a flat record body.
fn num_field<'a>(record: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("\"{key}\":");
    let start = record.find(&needle)? + needle.len();
    let rest = &record[start..];
    let end = rest.find(',').unwrap_or(rest.len());
    Some(&rest[..end])
}

fn fixed_hex<const N: usize>(s: &str) -> Option<[u8; N]> {
    let bytes = hex::decode(s).ok()?;
    let mut out = [0u8; N];
    if bytes.len() != N {
        return None;
    }
    out.copy_from_slice(&bytes);
    Some(out)
}

fn parse_int<T: std::str::FromStr>(
    token: &str,
    field: &'static str,
) -> Result<T, ProtocolError> {
    token.parse().map_err(|_| ProtocolError::BadField(field))
}

fn parse_flag(token: &str, field: &'static str) -> Result<bool, ProtocolError> {
    match token {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ProtocolError::BadField(field)),
    }
}
