//! The Transaction Builder
//!
//! One builder per transaction: constructed against a target height
//! and upgrade schedule (which fixes its version flags and branch id
//! for its lifetime), loaded with intents and keyed records, configured,
//! then consumed exactly once by [`TransactionBuilder::build`] or
//! serialized by [`TransactionBuilder::build_offline`].
//!
//! Single-threaded and synchronous; callers run builds on their own
//! worker if proof latency matters.

use std::sync::Arc;

use log::{debug, warn};
use rand::RngCore;
use rand::rngs::OsRng;

use sable_privacy::{
    CommitmentScheme, ExpandedSpendingKey, Memo, MerklePath, Note, NoteEncoding, NoteValue,
    OutgoingViewingKey, PaymentAddress, SpendingKey, encrypt_outgoing,
};
use sable_transaction::{
    ActivationPolicy, Amount, DEFAULT_FEE, OutPoint, OutputDescription, SEQUENCE_FINAL, Script,
    SpendDescription, Transaction, TransparentAddress, TxFormat, TxIn, TxOut,
    SHIELDED_TX_VERSION, signature_digest,
};

use crate::error::{BuildError, ProtocolError};
use crate::keystore::Keystore;
use crate::offline::SignRequest;
use crate::prover::{OutputProofInputs, ShieldedProver, SpendProofInputs};
use crate::result::BuildResult;
use crate::staging::{OutputIntent, ShieldedOutput, ShieldedSpend, SpendIntent, TransparentInput};

/// Builder for one mixed transparent/shielded transaction.
pub struct TransactionBuilder {
    format: TxFormat,
    branch_id: u32,
    height: u32,
    /// Plaintext encoding for notes this transaction creates.
    output_encoding: NoteEncoding,
    keystore: Option<Arc<dyn Keystore>>,
    scheme: CommitmentScheme,

    transparent_inputs: Vec<TransparentInput>,
    transparent_outputs: Vec<TxOut>,
    spend_intents: Vec<SpendIntent>,
    output_intents: Vec<OutputIntent>,
    spends: Vec<ShieldedSpend>,
    outputs: Vec<ShieldedOutput>,

    fee: Amount,
    min_confirmations: u32,
    lock_time: u32,
    expiry_height: u32,
    aux_data: Option<Vec<u8>>,
    change_shielded: Option<(PaymentAddress, OutgoingViewingKey)>,
    change_transparent: Option<TransparentAddress>,
}

impl TransactionBuilder {
    /// Builder for a transaction targeting `height` under `policy`.
    pub fn new(
        policy: &ActivationPolicy,
        height: u32,
        keystore: Option<Arc<dyn Keystore>>,
    ) -> Self {
        // New notes mature one block after the target
        let output_encoding = if policy.output_encoding_v2_active(height.saturating_add(1)) {
            NoteEncoding::V2
        } else {
            NoteEncoding::V1
        };
        Self::from_parts(
            policy.tx_format(height),
            policy.branch_id(height),
            height,
            policy.expiry_height(height),
            output_encoding,
            keystore,
        )
    }

    /// Builder with version flags supplied directly, as when
    /// reconstructing from an offline request.
    pub fn from_parts(
        format: TxFormat,
        branch_id: u32,
        height: u32,
        expiry_height: u32,
        output_encoding: NoteEncoding,
        keystore: Option<Arc<dyn Keystore>>,
    ) -> Self {
        Self {
            format,
            branch_id,
            height,
            output_encoding,
            keystore,
            scheme: CommitmentScheme::new(),
            transparent_inputs: Vec::new(),
            transparent_outputs: Vec::new(),
            spend_intents: Vec::new(),
            output_intents: Vec::new(),
            spends: Vec::new(),
            outputs: Vec::new(),
            fee: Amount::from_raw(DEFAULT_FEE).expect("default fee in range"),
            min_confirmations: 1,
            lock_time: 0,
            expiry_height,
            aux_data: None,
            change_shielded: None,
            change_transparent: None,
        }
    }

    pub fn format(&self) -> TxFormat {
        self.format
    }

    pub fn branch_id(&self) -> u32 {
        self.branch_id
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fee(&self) -> Amount {
        self.fee
    }

    pub fn min_confirmations(&self) -> u32 {
        self.min_confirmations
    }

    pub fn expiry_height(&self) -> u32 {
        self.expiry_height
    }

    pub fn output_encoding(&self) -> NoteEncoding {
        self.output_encoding
    }

    pub fn spend_intents(&self) -> &[SpendIntent] {
        &self.spend_intents
    }

    pub fn output_intents(&self) -> &[OutputIntent] {
        &self.output_intents
    }

    pub fn spends(&self) -> &[ShieldedSpend] {
        &self.spends
    }

    fn supports_shielded(&self) -> bool {
        self.format.overwintered && self.format.version >= SHIELDED_TX_VERSION
    }

    fn assert_shielded_supported(&self) {
        assert!(
            self.supports_shielded(),
            "shielded components require transaction version {SHIELDED_TX_VERSION}, draft is version {}",
            self.format.version
        );
    }

    // ------------------------------------------------------------------
    // Staging
    // ------------------------------------------------------------------

    /// Stage a transparent input.
    ///
    /// # Panics
    ///
    /// Panics if the spend condition needs a key and no attached
    /// keystore can sign it. That is a caller bug: inputs must be
    /// selected from spendable coins.
    pub fn add_transparent_input(&mut self, outpoint: OutPoint, condition: Script, value: Amount) {
        self.add_transparent_input_with_sequence(outpoint, condition, value, SEQUENCE_FINAL);
    }

    /// Stage a transparent input with an explicit sequence number.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Self::add_transparent_input`].
    pub fn add_transparent_input_with_sequence(
        &mut self,
        outpoint: OutPoint,
        condition: Script,
        value: Amount,
        sequence: u32,
    ) {
        if !condition.is_self_authorizing() {
            let keystore = self
                .keystore
                .as_ref()
                .expect("transparent input needs a keystore for its spend condition");
            assert!(
                keystore.can_sign(&condition),
                "keystore cannot sign the staged spend condition"
            );
        }
        self.transparent_inputs.push(TransparentInput {
            outpoint,
            spend_condition: condition,
            value,
            sequence,
        });
    }

    /// Stage a transparent output. Returns `false` if the address
    /// string does not parse.
    pub fn add_transparent_output(&mut self, address: &str, value: Amount) -> bool {
        let parsed = match TransparentAddress::parse(address) {
            Ok(addr) => addr,
            Err(err) => {
                warn!("rejecting transparent output to {address}: {err}");
                return false;
            }
        };
        if value.is_negative() {
            warn!("rejecting transparent output with negative value");
            return false;
        }
        self.transparent_outputs.push(TxOut {
            value,
            script_pubkey: parsed.script_pubkey(),
        });
        true
    }

    /// Add a fully keyed shielded spend. Returns `false` if its anchor
    /// differs from the first spend's; the spend list is untouched in
    /// that case.
    ///
    /// # Panics
    ///
    /// Panics if the draft's version predates shielded support.
    pub fn add_spend(
        &mut self,
        expsk: ExpandedSpendingKey,
        note: Note,
        witness: MerklePath,
    ) -> bool {
        self.assert_shielded_supported();

        let anchor = witness.root(&self.scheme, &note.commitment(&self.scheme));
        if let Some(first) = self.spends.first()
            && first.anchor != anchor
        {
            warn!("rejecting spend with mismatched anchor");
            return false;
        }

        self.spends
            .push(ShieldedSpend::new(expsk, note, anchor, witness, &mut OsRng));
        true
    }

    /// Add a fully keyed shielded output. Returns `false` if the value
    /// is negative.
    ///
    /// # Panics
    ///
    /// Panics if the draft's version predates shielded support.
    pub fn add_output(
        &mut self,
        ovk: OutgoingViewingKey,
        to: PaymentAddress,
        value: Amount,
        memo: Memo,
    ) -> bool {
        self.assert_shielded_supported();
        let Ok(raw) = u64::try_from(value.raw()) else {
            warn!("rejecting shielded output with negative value");
            return false;
        };
        let note = Note::random(to, NoteValue(raw), &mut OsRng);
        self.outputs.push(ShieldedOutput { ovk, note, memo });
        true
    }

    /// Stage a spend intent (no spending key yet). Returns `false` if
    /// its sender address differs from the first staged intent's.
    ///
    /// # Panics
    ///
    /// Panics if the draft's version predates shielded support.
    pub fn add_spend_raw(&mut self, intent: SpendIntent) -> bool {
        self.assert_shielded_supported();
        if let Some(first) = self.spend_intents.first()
            && first.sender() != intent.sender()
        {
            warn!("rejecting spend intent from a second sender address");
            return false;
        }
        self.spend_intents.push(intent);
        true
    }

    /// Stage an output intent. Returns `false` if the value is
    /// negative.
    ///
    /// # Panics
    ///
    /// Panics if the draft's version predates shielded support.
    pub fn add_output_raw(&mut self, address: PaymentAddress, value: Amount, memo: Memo) -> bool {
        self.assert_shielded_supported();
        if value.is_negative() {
            warn!("rejecting output intent with negative value");
            return false;
        }
        self.output_intents.push(OutputIntent {
            address,
            value,
            memo,
        });
        true
    }

    /// Convert every staged spend intent into a keyed spend with the
    /// given key. Atomic: on any failure nothing changes and `false`
    /// is returned.
    pub fn convert_raw_spends(&mut self, key: &SpendingKey) -> bool {
        let expsk = key.expand();
        let fvk = key.full_viewing_key();

        let mut converted = Vec::with_capacity(self.spend_intents.len());
        let mut anchor = self.spends.first().map(|s| s.anchor);
        for intent in &self.spend_intents {
            if fvk.address(intent.note.recipient.diversifier) != intent.note.recipient {
                warn!("spending key does not own a staged note; aborting conversion");
                return false;
            }
            let root = intent
                .witness
                .root(&self.scheme, &intent.note.commitment(&self.scheme));
            match anchor {
                None => anchor = Some(root),
                Some(expected) if expected != root => {
                    warn!("staged spends disagree on the anchor; aborting conversion");
                    return false;
                }
                Some(_) => {}
            }
            converted.push(ShieldedSpend::new(
                expsk.clone(),
                intent.note.clone(),
                root,
                intent.witness.clone(),
                &mut OsRng,
            ));
        }

        self.spends.append(&mut converted);
        self.spend_intents.clear();
        true
    }

    /// Convert every staged output intent into a keyed output under
    /// the given outgoing viewing key.
    pub fn convert_raw_outputs(&mut self, ovk: &OutgoingViewingKey) -> bool {
        for intent in self.output_intents.drain(..) {
            let value = intent.value.raw() as u64; // non-negative since staging
            let note = Note::random(intent.address, NoteValue(value), &mut OsRng);
            self.outputs.push(ShieldedOutput {
                ovk: ovk.clone(),
                note,
                memo: intent.memo,
            });
        }
        true
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn set_fee(&mut self, fee: Amount) {
        self.fee = fee;
    }

    pub fn set_min_confirmations(&mut self, min_confirmations: u32) {
        self.min_confirmations = min_confirmations;
    }

    pub fn set_lock_time(&mut self, lock_time: u32) {
        self.lock_time = lock_time;
    }

    pub fn set_expiry_height(&mut self, expiry_height: u32) {
        self.expiry_height = expiry_height;
    }

    /// Return surplus value to a shielded address.
    pub fn send_change_to_shielded(&mut self, address: PaymentAddress, ovk: OutgoingViewingKey) {
        self.change_shielded = Some((address, ovk));
    }

    /// Return surplus value to a transparent address.
    pub fn send_change_to_transparent(&mut self, address: TransparentAddress) {
        self.change_transparent = Some(address);
    }

    /// Attach an auxiliary data payload, emitted as a final zero-value
    /// transparent output during build.
    pub fn set_aux_data(&mut self, data: Vec<u8>) {
        self.aux_data = Some(data);
    }

    // ------------------------------------------------------------------
    // Build
    // ------------------------------------------------------------------

    /// Run the online build: resolve change, prove, sign.
    pub fn build(self, prover: &dyn ShieldedProver) -> BuildResult {
        match self.build_inner(prover) {
            Ok(tx) => BuildResult::Transaction(tx),
            Err(err) => {
                warn!("build failed: {err}");
                BuildResult::from_error(err)
            }
        }
    }

    /// Serialize the staged (key-free) state into the offline signing
    /// command line.
    pub fn build_offline(&self) -> Result<String, ProtocolError> {
        SignRequest::from_builder(self)?.encode()
    }

    fn build_inner(mut self, prover: &dyn ShieldedProver) -> Result<Transaction, BuildError> {
        if !self.spend_intents.is_empty() || !self.output_intents.is_empty() {
            return Err(BuildError::UnconvertedIntents);
        }

        // Phase 1: balance
        let change = self.change_value()?;
        if change.is_negative() {
            return Err(BuildError::NegativeChange);
        }
        debug!(
            "build: {} spends, {} outputs, change {change}",
            self.spends.len(),
            self.outputs.len()
        );

        // Phase 2: change destination
        if change.is_positive() {
            self.resolve_change(change)?;
        }

        // Phase 3: aux payload flush
        if let Some(data) = self.aux_data.take() {
            let mut script = Vec::with_capacity(1 + data.len());
            script.push(0x6a);
            script.extend_from_slice(&data);
            self.transparent_outputs.push(TxOut {
                value: Amount::ZERO,
                script_pubkey: Script::from_bytes(script),
            });
        }

        // Phase 4: skeleton
        let mut tx = Transaction::new(self.format);
        tx.lock_time = self.lock_time;
        tx.expiry_height = self.expiry_height;
        tx.vin = self
            .transparent_inputs
            .iter()
            .map(|input| TxIn {
                prevout: input.outpoint,
                script_sig: Script::empty(),
                sequence: input.sequence,
            })
            .collect();
        tx.vout = self.transparent_outputs.clone();
        tx.value_balance = self.shielded_net()?;

        // Phase 5: spend descriptions
        for spend in &self.spends {
            let fvk = spend.expsk.full_viewing_key();
            let cmu = spend.note.commitment(&self.scheme);
            if spend.witness.root(&self.scheme, &cmu) != spend.anchor {
                return Err(BuildError::InvalidSpend);
            }
            let nullifier =
                fvk.nullifier_key()
                    .derive(&self.scheme, &cmu, spend.witness.position);

            let proof = prover.spend_proof(&SpendProofInputs {
                ak: fvk.ak,
                nsk: spend.expsk.nsk,
                diversifier: spend.note.recipient.diversifier.0,
                rcm: spend.note.rcm,
                alpha: spend.alpha,
                value: spend.note.value.raw(),
                anchor: spend.anchor,
                witness: &spend.witness,
            })?;

            tx.shielded_spends.push(SpendDescription {
                cv: proof.cv,
                anchor: spend.anchor,
                nullifier,
                rk: proof.rk,
                zkproof: proof.zkproof,
                spend_auth_sig: [0u8; 64],
            });
        }

        // Phase 6: output descriptions
        for output in &self.outputs {
            let mut esk = [0u8; 32];
            OsRng.fill_bytes(&mut esk);

            let proof = prover.output_proof(&OutputProofInputs {
                esk,
                address: &output.note.recipient,
                rcm: output.note.rcm,
                value: output.note.value.raw(),
                encoding: self.output_encoding,
                memo: &output.memo,
            })?;

            let cmu = output.note.commitment(&self.scheme);
            let out_ciphertext = encrypt_outgoing(
                &output.ovk,
                &proof.cv,
                cmu.as_bytes(),
                &proof.epk,
                &output.note.recipient.pk_d,
                &esk,
            );

            tx.shielded_outputs.push(OutputDescription {
                cv: proof.cv,
                cmu,
                epk: proof.epk,
                enc_ciphertext: proof.enc_ciphertext,
                out_ciphertext,
                zkproof: proof.zkproof,
            });
        }

        // Phase 7: signatures
        let digest = signature_digest(&tx, self.branch_id);
        for (description, spend) in tx.shielded_spends.iter_mut().zip(&self.spends) {
            description.spend_auth_sig =
                prover.spend_auth_sig(&spend.expsk.ask, &spend.alpha, &digest)?;
        }
        if tx.has_shielded_components() {
            tx.binding_sig = Some(prover.binding_sig(tx.value_balance, &digest)?);
        }

        for (i, input) in self.transparent_inputs.iter().enumerate() {
            if input.spend_condition.is_self_authorizing() {
                continue;
            }
            let script_sig = self
                .keystore
                .as_ref()
                .and_then(|ks| ks.sign_transparent(&input.spend_condition, &digest))
                .ok_or(BuildError::TransparentSignature(i))?;
            tx.vin[i].script_sig = script_sig;
        }

        debug!("build: finished transaction {}", hex::encode(tx.txid()));
        Ok(tx)
    }

    /// Net shielded flow of the keyed records: positive means value
    /// leaves the pool.
    fn shielded_net(&self) -> Result<Amount, BuildError> {
        let mut net = Amount::ZERO;
        for spend in &self.spends {
            net = net
                .checked_add(amount_of(spend.note.value)?)
                .map_err(|_| BuildError::ValueOutOfRange)?;
        }
        for output in &self.outputs {
            net = net
                .checked_sub(amount_of(output.note.value)?)
                .map_err(|_| BuildError::ValueOutOfRange)?;
        }
        Ok(net)
    }

    fn change_value(&self) -> Result<Amount, BuildError> {
        let mut change = self.shielded_net()?;
        for input in &self.transparent_inputs {
            change = change
                .checked_add(input.value)
                .map_err(|_| BuildError::ValueOutOfRange)?;
        }
        for output in &self.transparent_outputs {
            change = change
                .checked_sub(output.value)
                .map_err(|_| BuildError::ValueOutOfRange)?;
        }
        change
            .checked_sub(self.fee)
            .map_err(|_| BuildError::ValueOutOfRange)
    }

    /// Strict precedence: explicit shielded address, explicit
    /// transparent address, first keyed spend's own address.
    fn resolve_change(&mut self, change: Amount) -> Result<(), BuildError> {
        let raw = u64::try_from(change.raw()).map_err(|_| BuildError::ValueOutOfRange)?;

        if let Some((address, ovk)) = self.change_shielded.clone() {
            debug!("change {change} to explicit shielded address");
            let note = Note::random(address, NoteValue(raw), &mut OsRng);
            self.outputs.push(ShieldedOutput {
                ovk,
                note,
                memo: Memo::empty(),
            });
        } else if let Some(address) = self.change_transparent {
            debug!("change {change} to explicit transparent address");
            self.transparent_outputs.push(TxOut {
                value: change,
                script_pubkey: address.script_pubkey(),
            });
        } else if let Some(first) = self.spends.first() {
            debug!("change {change} back to the first spend's address");
            let note = Note::random(first.note.recipient, NoteValue(raw), &mut OsRng);
            let ovk = first.expsk.ovk.clone();
            self.outputs.push(ShieldedOutput {
                ovk,
                note,
                memo: Memo::empty(),
            });
        } else {
            return Err(BuildError::NoChangeAddress);
        }
        Ok(())
    }

    pub(crate) fn transparent_inputs(&self) -> &[TransparentInput] {
        &self.transparent_inputs
    }

    pub(crate) fn transparent_outputs(&self) -> &[TxOut] {
        &self.transparent_outputs
    }

    pub(crate) fn shielded_change_address(&self) -> Option<&PaymentAddress> {
        self.change_shielded.as_ref().map(|(address, _)| address)
    }
}

fn amount_of(value: NoteValue) -> Result<Amount, BuildError> {
    Amount::from_u64(value.raw()).map_err(|_| BuildError::ValueOutOfRange)
}
