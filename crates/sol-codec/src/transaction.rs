//! Signed transaction envelope.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact length
//!   signatures              64 bytes * num_signatures
//!   message                 see `message`
//! ```
//!
//! Signature slot `i` belongs to account key `i`; there is one slot per
//! required signature. Unsigned slots hold 64 zero bytes.

use ed25519_dalek::{Signature, VerifyingKey};

use crate::error::SolError;
use crate::keypair::Keypair;
use crate::message::Message;
use crate::pubkey::Pubkey;
use crate::reader::BinaryReader;
use crate::writer::BinaryWriter;

/// Length of an Ed25519 signature.
pub const SIGNATURE_BYTES: usize = 64;

/// The System Program: 32 zero bytes, Base58 `11111111111111111111111111111111`.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

const EMPTY_SIGNATURE: [u8; SIGNATURE_BYTES] = [0u8; SIGNATURE_BYTES];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    signatures: Vec<[u8; SIGNATURE_BYTES]>,
    message: Message,
}

impl Transaction {
    /// A transaction with every signature slot zeroed.
    pub fn new_unsigned(message: Message) -> Self {
        let slots = usize::from(message.header().num_required_signatures);
        Self {
            signatures: vec![EMPTY_SIGNATURE; slots],
            message,
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn signatures(&self) -> &[[u8; SIGNATURE_BYTES]] {
        &self.signatures
    }

    /// The bytes covered by every signature.
    pub fn message_data(&self) -> Vec<u8> {
        self.message.serialize()
    }

    /// Sign every required slot. Fails if a keypair is not a required signer
    /// or if any required slot is left unsigned.
    pub fn sign(&mut self, signers: &[&Keypair]) -> Result<(), SolError> {
        self.partial_sign(signers)?;
        if let Some(slot) = self.signatures.iter().position(|s| *s == EMPTY_SIGNATURE) {
            return Err(SolError::Signing(format!(
                "missing signature for {}",
                self.message.signer_keys()[slot]
            )));
        }
        Ok(())
    }

    /// Sign the slots belonging to `signers`, leaving the others untouched.
    pub fn partial_sign(&mut self, signers: &[&Keypair]) -> Result<(), SolError> {
        let data = self.message_data();
        for keypair in signers {
            let pubkey = keypair.pubkey();
            let slot = self
                .message
                .signer_keys()
                .iter()
                .position(|k| *k == pubkey)
                .ok_or_else(|| {
                    SolError::Signing(format!("{pubkey} not found in transaction signers"))
                })?;
            self.signatures[slot] = keypair.sign(&data);
            log::debug!("signed slot {slot} for {pubkey}");
        }
        Ok(())
    }

    pub fn is_signed(&self) -> bool {
        self.signatures.iter().all(|s| *s != EMPTY_SIGNATURE)
    }

    /// Check every slot against its signer key.
    pub fn verify_signatures(&self) -> Result<(), SolError> {
        let data = self.message_data();
        for (slot, (sig, key)) in self
            .signatures
            .iter()
            .zip(self.message.signer_keys())
            .enumerate()
        {
            let vk = VerifyingKey::from_bytes(key.as_array()).map_err(|_| {
                SolError::InvalidPublicKey(format!("signer {slot} is not a curve point"))
            })?;
            vk.verify_strict(&data, &Signature::from_bytes(sig))
                .map_err(|_| {
                    SolError::Signing(format!("invalid signature in slot {slot} for {key}"))
                })?;
        }
        Ok(())
    }

    /// Serialize into wire format, ready for submission.
    pub fn serialize(&self) -> Vec<u8> {
        let message = self.message.serialize();
        let mut w = BinaryWriter::with_capacity(
            3 + SIGNATURE_BYTES * self.signatures.len() + message.len(),
        );
        w.write_compact_length(self.signatures.len());
        for sig in &self.signatures {
            w.write_fixed_array(sig);
        }
        w.write_fixed_array(&message);
        w.into_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, SolError> {
        let mut reader = BinaryReader::new(bytes);

        let count = reader.read_compact_length()?;
        if count.saturating_mul(SIGNATURE_BYTES) > reader.remaining() {
            return Err(SolError::MalformedInput(format!(
                "transaction too short for {count} signature slots"
            )));
        }
        let signatures = (0..count)
            .map(|_| reader.read_array::<SIGNATURE_BYTES>())
            .collect::<Result<Vec<_>, _>>()?;

        let message = Message::read_from(&mut reader)?;
        if !reader.is_empty() {
            return Err(SolError::MalformedInput(format!(
                "{} trailing bytes after message",
                reader.remaining()
            )));
        }

        let required = usize::from(message.header().num_required_signatures);
        if count != required {
            return Err(SolError::MalformedInput(format!(
                "{count} signatures but message requires {required}"
            )));
        }

        Ok(Self {
            signatures,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{AccountMeta, Instruction};

    fn transfer_tx(from: &Keypair, to: Pubkey, lamports: u64) -> Transaction {
        let mut data = 2u32.to_le_bytes().to_vec();
        data.extend_from_slice(&lamports.to_le_bytes());
        let ix = Instruction::new(
            SYSTEM_PROGRAM_ID,
            vec![AccountMeta::new(from.pubkey(), true), AccountMeta::new(to, false)],
            data,
        );
        let message = Message::compile(&[ix], &from.pubkey(), [0xcc; 32]).unwrap();
        Transaction::new_unsigned(message)
    }

    // -- Signing ------------------------------------------------------------

    #[test]
    fn sign_produces_valid_wire_bytes() {
        let from = Keypair::from_seed(&[0x42u8; 32]).unwrap();
        let mut tx = transfer_tx(&from, Pubkey::filled(0xbb), 1_000_000);
        tx.sign(&[&from]).unwrap();
        let wire = tx.serialize();

        // compact count = 1, then the 64-byte signature, then the message.
        assert_eq!(wire[0], 0x01);
        let sig: [u8; 64] = wire[1..65].try_into().unwrap();
        let vk = VerifyingKey::from_bytes(from.pubkey().as_array()).unwrap();
        assert!(vk.verify_strict(&wire[65..], &Signature::from_bytes(&sig)).is_ok());
        assert!(tx.verify_signatures().is_ok());
    }

    #[test]
    fn sign_is_deterministic() {
        let from = Keypair::from_seed(&[0x55u8; 32]).unwrap();
        let mut a = transfer_tx(&from, Pubkey::filled(0x77), 42);
        let mut b = transfer_tx(&from, Pubkey::filled(0x77), 42);
        a.sign(&[&from]).unwrap();
        b.sign(&[&from]).unwrap();
        assert_eq!(a.serialize(), b.serialize());
    }

    #[test]
    fn unsigned_transaction_has_zeroed_slots() {
        let from = Keypair::from_seed(&[0x01u8; 32]).unwrap();
        let tx = transfer_tx(&from, Pubkey::filled(2), 1);
        assert_eq!(tx.signatures(), &[EMPTY_SIGNATURE]);
        assert!(!tx.is_signed());
        assert!(tx.verify_signatures().is_err());
    }

    #[test]
    fn wrong_signer_is_rejected() {
        let from = Keypair::from_seed(&[0x11u8; 32]).unwrap();
        let other = Keypair::from_seed(&[0x22u8; 32]).unwrap();
        let mut tx = transfer_tx(&from, Pubkey::filled(0xbb), 1000);
        let err = tx.sign(&[&other]).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn partial_sign_fills_only_own_slot() {
        let payer = Keypair::from_seed(&[0x31u8; 32]).unwrap();
        let cosigner = Keypair::from_seed(&[0x32u8; 32]).unwrap();
        let ix = Instruction::new(
            Pubkey::filled(9),
            vec![AccountMeta::new_readonly(cosigner.pubkey(), true)],
            vec![1, 2, 3],
        );
        let message = Message::compile(&[ix], &payer.pubkey(), [0; 32]).unwrap();
        let mut tx = Transaction::new_unsigned(message);

        tx.partial_sign(&[&cosigner]).unwrap();
        assert_eq!(tx.signatures()[0], EMPTY_SIGNATURE);
        assert_ne!(tx.signatures()[1], EMPTY_SIGNATURE);
        assert!(!tx.is_signed());

        let mut incomplete = tx.clone();
        assert!(incomplete.sign(&[]).is_err());

        tx.partial_sign(&[&payer]).unwrap();
        assert!(tx.is_signed());
        assert!(tx.verify_signatures().is_ok());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let from = Keypair::from_seed(&[0x42u8; 32]).unwrap();
        let mut tx = transfer_tx(&from, Pubkey::filled(0xbb), 5);
        tx.sign(&[&from]).unwrap();
        let mut wire = tx.serialize();
        let last = wire.len() - 1;
        wire[last] ^= 1;
        let tampered = Transaction::deserialize(&wire).unwrap();
        assert!(tampered.verify_signatures().is_err());
    }

    // -- Wire parsing -------------------------------------------------------

    #[test]
    fn raw_unsigned_wire_can_be_signed() {
        let from = Keypair::from_seed(&[0x42u8; 32]).unwrap();
        let mut signed = transfer_tx(&from, Pubkey::filled(0xbb), 1_000_000);
        signed.sign(&[&from]).unwrap();
        let wire_normal = signed.serialize();

        // Same wire with the signature slot zeroed, as a dApp would hand it over.
        let mut raw = wire_normal.clone();
        raw[1..65].fill(0);

        let mut parsed = Transaction::deserialize(&raw).unwrap();
        parsed.sign(&[&from]).unwrap();
        assert_eq!(parsed.serialize(), wire_normal);
    }

    #[test]
    fn signature_count_must_match_header() {
        let from = Keypair::from_seed(&[0x42u8; 32]).unwrap();
        let tx = transfer_tx(&from, Pubkey::filled(0xbb), 1);
        let mut wire = vec![2u8];
        wire.extend_from_slice(&[0u8; 128]);
        wire.extend_from_slice(&tx.message_data());
        assert!(Transaction::deserialize(&wire).is_err());
    }

    #[test]
    fn truncated_input_fails() {
        assert!(Transaction::deserialize(&[]).is_err());
        assert!(Transaction::deserialize(&[0x01]).is_err());
        let mut short = vec![0x01];
        short.extend_from_slice(&[0u8; 64]);
        short.extend_from_slice(&[1, 0]);
        let err = Transaction::deserialize(&short).unwrap_err();
        assert_eq!(err.to_string(), "malformed input: missing message header");
    }

    #[test]
    fn system_program_id_is_all_ones_in_base58() {
        assert_eq!(SYSTEM_PROGRAM_ID.to_string(), "11111111111111111111111111111111");
    }
}
