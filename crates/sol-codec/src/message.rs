//! Legacy transaction message: the bytes that get signed.
//!
//! ```text
//! Message:
//!   num_required_sigs     u8
//!   num_readonly_signed   u8
//!   num_readonly_unsigned u8
//!   num_accounts          compact length
//!   account_keys          32 bytes * num_accounts
//!   recent_blockhash      32 bytes
//!   num_instructions      compact length
//!   instructions[]
//!
//! Instruction:
//!   program_id_index      u8
//!   num_accounts          compact length
//!   account_indices       u8 * num_accounts
//!   data_len              compact length
//!   data                  u8 * data_len
//! ```
//!
//! Signer and writable flags are not stored per key. They follow from each
//! key's position relative to the three header counts.

use std::collections::{BTreeMap, HashSet};

use crate::error::SolError;
use crate::pubkey::Pubkey;
use crate::reader::BinaryReader;
use crate::writer::BinaryWriter;

/// Header bytes at the front of every message.
pub const MESSAGE_HEADER_LEN: usize = 3;

/// Account indices are single bytes.
const MAX_ACCOUNT_KEYS: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// The first N account keys must sign.
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed_accounts: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned_accounts: u8,
}

impl MessageHeader {
    pub fn new(required: u8, readonly_signed: u8, readonly_unsigned: u8) -> Self {
        Self {
            num_required_signatures: required,
            num_readonly_signed_accounts: readonly_signed,
            num_readonly_unsigned_accounts: readonly_unsigned,
        }
    }
}

/// An instruction whose accounts are indices into the message key table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// A single account reference in an [`Instruction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// A writable account.
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

impl Instruction {
    pub fn new(program_id: Pubkey, accounts: Vec<AccountMeta>, data: Vec<u8>) -> Self {
        Self {
            program_id,
            accounts,
            data,
        }
    }
}

/// A sanitized message. Every index it carries points into `account_keys`
/// and the header counts fit the key table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    header: MessageHeader,
    account_keys: Vec<Pubkey>,
    recent_blockhash: [u8; 32],
    instructions: Vec<CompiledInstruction>,
    /// key index -> key, for every index used as a program id.
    program_ids: BTreeMap<usize, Pubkey>,
}

impl Message {
    pub fn new(
        header: MessageHeader,
        account_keys: Vec<Pubkey>,
        recent_blockhash: [u8; 32],
        instructions: Vec<CompiledInstruction>,
    ) -> Result<Self, SolError> {
        sanitize(&header, &account_keys, &instructions)?;

        let program_ids = instructions
            .iter()
            .map(|ix| {
                let index = usize::from(ix.program_id_index);
                (index, account_keys[index])
            })
            .collect();

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
            program_ids,
        })
    }

    /// Build a message from uncompiled instructions with a single fee payer.
    ///
    /// Accounts are deduplicated (permission bits are OR-ed) and laid out in
    /// canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub fn compile(
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        recent_blockhash: [u8; 32],
    ) -> Result<Self, SolError> {
        struct AccountEntry {
            pubkey: Pubkey,
            is_signer: bool,
            is_writable: bool,
        }

        let mut entries: Vec<AccountEntry> = Vec::new();
        let mut upsert = |pubkey: Pubkey, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(AccountEntry {
                    pubkey,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        // Fee payer is always signer + writable.
        upsert(*fee_payer, true, true);

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            // Program ids are non-signer, read-only accounts.
            upsert(ix.program_id, false, false);
        }

        if entries.len() > MAX_ACCOUNT_KEYS {
            return Err(SolError::TransactionBuild(format!(
                "{} account keys exceed the limit of {MAX_ACCOUNT_KEYS}",
                entries.len()
            )));
        }

        // Stable sort: within a category insertion order is kept, so the fee
        // payer (first writable signer inserted) stays at index 0.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        let count = |pred: fn(&AccountEntry) -> bool| -> Result<u8, SolError> {
            let n = entries.iter().filter(|e| pred(e)).count();
            u8::try_from(n).map_err(|_| {
                SolError::TransactionBuild(format!("header count {n} does not fit in a byte"))
            })
        };
        let header = MessageHeader {
            num_required_signatures: count(|e| e.is_signer)?,
            num_readonly_signed_accounts: count(|e| e.is_signer && !e.is_writable)?,
            num_readonly_unsigned_accounts: count(|e| !e.is_signer && !e.is_writable)?,
        };

        let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();
        let index_of = |key: &Pubkey| -> Result<u8, SolError> {
            account_keys
                .iter()
                .position(|k| k == key)
                .and_then(|i| u8::try_from(i).ok())
                .ok_or_else(|| {
                    SolError::TransactionBuild(format!("account {key} not in account keys"))
                })
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            compiled.push(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                accounts: ix
                    .accounts
                    .iter()
                    .map(|meta| index_of(&meta.pubkey))
                    .collect::<Result<_, _>>()?,
                data: ix.data.clone(),
            });
        }

        Self::new(header, account_keys, recent_blockhash, compiled)
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn account_keys(&self) -> &[Pubkey] {
        &self.account_keys
    }

    pub fn recent_blockhash(&self) -> &[u8; 32] {
        &self.recent_blockhash
    }

    pub fn instructions(&self) -> &[CompiledInstruction] {
        &self.instructions
    }

    /// The keys whose signatures are required, in signature-slot order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..usize::from(self.header.num_required_signatures)]
    }

    /// Serialize to wire format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut w = BinaryWriter::with_capacity(
            MESSAGE_HEADER_LEN + 1 + 32 * self.account_keys.len() + 32 + 1,
        );

        w.write_u8(self.header.num_required_signatures);
        w.write_u8(self.header.num_readonly_signed_accounts);
        w.write_u8(self.header.num_readonly_unsigned_accounts);

        w.write_compact_length(self.account_keys.len());
        for key in &self.account_keys {
            w.write_pubkey(key);
        }

        w.write_fixed_array(&self.recent_blockhash);

        w.write_compact_length(self.instructions.len());
        for ix in &self.instructions {
            w.write_u8(ix.program_id_index);
            w.write_compact_length(ix.accounts.len());
            w.write_fixed_array(&ix.accounts);
            w.write_compact_length(ix.data.len());
            w.write_fixed_array(&ix.data);
        }

        w.into_bytes()
    }

    /// Parse a complete message. Bytes left over after the last instruction
    /// are rejected.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, SolError> {
        let mut reader = BinaryReader::new(bytes);
        let message = Self::read_from(&mut reader)?;
        if !reader.is_empty() {
            return Err(SolError::MalformedInput(format!(
                "{} trailing bytes after message",
                reader.remaining()
            )));
        }
        Ok(message)
    }

    pub(crate) fn read_from(reader: &mut BinaryReader<'_>) -> Result<Self, SolError> {
        if reader.remaining() < MESSAGE_HEADER_LEN {
            return Err(SolError::MalformedInput("missing message header".into()));
        }
        let header = MessageHeader {
            num_required_signatures: reader.read_u8()?,
            num_readonly_signed_accounts: reader.read_u8()?,
            num_readonly_unsigned_accounts: reader.read_u8()?,
        };

        let num_keys = reader.read_compact_length()?;
        if num_keys > MAX_ACCOUNT_KEYS {
            return Err(SolError::MalformedInput(format!(
                "{num_keys} account keys exceed the limit of {MAX_ACCOUNT_KEYS}"
            )));
        }
        let account_keys = (0..num_keys)
            .map(|_| reader.read_pubkey())
            .collect::<Result<Vec<_>, _>>()?;

        let recent_blockhash = reader.read_array::<32>()?;

        let num_instructions = reader.read_compact_length()?;
        // Each instruction takes at least three bytes.
        let mut instructions = Vec::with_capacity(num_instructions.min(reader.remaining() / 3));
        for _ in 0..num_instructions {
            let program_id_index = reader.read_u8()?;
            let num_accounts = reader.read_compact_length()?;
            let accounts = reader.read_fixed_array(num_accounts)?;
            let data_len = reader.read_compact_length()?;
            let data = reader.read_fixed_array(data_len)?;
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }

        log::debug!(
            "decoded message: {} account keys, {} instructions",
            account_keys.len(),
            instructions.len()
        );
        Self::new(header, account_keys, recent_blockhash, instructions)
    }

    pub fn is_account_signer(&self, index: usize) -> bool {
        index < usize::from(self.header.num_required_signatures)
    }

    pub fn is_account_writable(&self, index: usize) -> bool {
        let required = usize::from(self.header.num_required_signatures);
        if index >= self.account_keys.len() {
            return false;
        }
        if index < required {
            index < required - usize::from(self.header.num_readonly_signed_accounts)
        } else {
            index < self.account_keys.len() - usize::from(self.header.num_readonly_unsigned_accounts)
        }
    }

    pub fn is_program_id(&self, index: usize) -> bool {
        self.program_ids.contains_key(&index)
    }

    /// Keys invoked as programs, in key-table order.
    pub fn program_ids(&self) -> Vec<Pubkey> {
        self.program_ids.values().copied().collect()
    }

    /// Keys never invoked as programs, in key-table order.
    pub fn non_program_ids(&self) -> Vec<Pubkey> {
        self.account_keys
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_program_id(*i))
            .map(|(_, key)| *key)
            .collect()
    }
}

fn sanitize(
    header: &MessageHeader,
    account_keys: &[Pubkey],
    instructions: &[CompiledInstruction],
) -> Result<(), SolError> {
    let n = account_keys.len();
    let required = usize::from(header.num_required_signatures);
    let readonly_signed = usize::from(header.num_readonly_signed_accounts);
    let readonly_unsigned = usize::from(header.num_readonly_unsigned_accounts);

    if n > MAX_ACCOUNT_KEYS {
        return Err(SolError::MalformedInput(format!(
            "{n} account keys exceed the limit of {MAX_ACCOUNT_KEYS}"
        )));
    }
    if required > n {
        return Err(SolError::MalformedInput(format!(
            "{required} required signatures but only {n} account keys"
        )));
    }
    if readonly_signed > required {
        return Err(SolError::MalformedInput(format!(
            "{readonly_signed} read-only signers exceed {required} required signatures"
        )));
    }
    if readonly_unsigned > n - required {
        return Err(SolError::MalformedInput(format!(
            "{readonly_unsigned} read-only non-signers exceed {} non-signing keys",
            n - required
        )));
    }

    let mut seen = HashSet::with_capacity(n);
    if let Some(dup) = account_keys.iter().find(|k| !seen.insert(**k)) {
        return Err(SolError::MalformedInput(format!("duplicate account key {dup}")));
    }

    for (i, ix) in instructions.iter().enumerate() {
        if usize::from(ix.program_id_index) >= n {
            return Err(SolError::MalformedInput(format!(
                "instruction {i}: program id index {} out of range for {n} keys",
                ix.program_id_index
            )));
        }
        if let Some(bad) = ix.accounts.iter().find(|a| usize::from(**a) >= n) {
            return Err(SolError::MalformedInput(format!(
                "instruction {i}: account index {bad} out of range for {n} keys"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn key(byte: u8) -> Pubkey {
        Pubkey::filled(byte)
    }

    // -- Wire format --------------------------------------------------------

    #[test]
    fn single_empty_instruction_wire_bytes() {
        let fee_payer = key(0x11);
        let blockhash = [0x22u8; 32];
        let message = Message::new(
            MessageHeader::new(1, 0, 0),
            vec![fee_payer],
            blockhash,
            vec![CompiledInstruction::default()],
        )
        .unwrap();

        let bytes = message.serialize();
        let mut expected = vec![1, 0, 0, 1];
        expected.extend_from_slice(&[0x11; 32]);
        expected.extend_from_slice(&blockhash);
        expected.extend_from_slice(&[1, 0, 0, 0]);
        assert_eq!(bytes, expected);

        assert_eq!(Message::deserialize(&bytes).unwrap(), message);
    }

    #[test]
    fn blockhash_sits_after_account_keys() {
        let blockhash = [0xccu8; 32];
        let message = Message::new(
            MessageHeader::new(1, 0, 1),
            vec![key(1), key(2), key(3)],
            blockhash,
            vec![CompiledInstruction {
                program_id_index: 2,
                accounts: vec![0, 1],
                data: vec![9; 12],
            }],
        )
        .unwrap();
        let bytes = message.serialize();
        let offset = MESSAGE_HEADER_LEN + 1 + 32 * 3;
        assert_eq!(&bytes[offset..offset + 32], &blockhash);
        assert_eq!(&bytes[offset + 32..], &[1, 2, 2, 0, 1, 12, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9]);
    }

    #[test]
    fn short_input_is_missing_header() {
        let cases: [&[u8]; 3] = [&[], &[1], &[1, 0]];
        for bytes in cases {
            let err = Message::deserialize(bytes).unwrap_err();
            assert_eq!(err.to_string(), "malformed input: missing message header");
        }
    }

    #[test]
    fn truncated_key_table_fails() {
        let mut bytes = vec![1, 0, 0, 2];
        bytes.extend_from_slice(&[7u8; 40]);
        assert!(matches!(
            Message::deserialize(&bytes),
            Err(SolError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let message = Message::new(MessageHeader::new(1, 0, 0), vec![key(1)], [0; 32], vec![])
            .unwrap();
        let mut bytes = message.serialize();
        bytes.push(0);
        assert!(Message::deserialize(&bytes).is_err());
    }

    #[test]
    fn random_messages_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let n: usize = rng.gen_range(1..=12);
            let keys: Vec<Pubkey> = (0..n).map(|_| Pubkey::new_from_array(rng.gen())).collect();
            let r = rng.gen_range(0..=n);
            let s = rng.gen_range(0..=r);
            let u = rng.gen_range(0..=n - r);
            let instructions = (0..rng.gen_range(0..4))
                .map(|_| CompiledInstruction {
                    program_id_index: rng.gen_range(0..n) as u8,
                    accounts: (0..rng.gen_range(0..6)).map(|_| rng.gen_range(0..n) as u8).collect(),
                    data: (0..rng.gen_range(0..200)).map(|_| rng.gen()).collect(),
                })
                .collect();

            let message = Message::new(
                MessageHeader::new(r as u8, s as u8, u as u8),
                keys,
                rng.gen(),
                instructions,
            )
            .unwrap();
            let decoded = Message::deserialize(&message.serialize()).unwrap();
            assert_eq!(decoded, message);
            for i in 0..n {
                assert_eq!(decoded.is_account_signer(i), message.is_account_signer(i));
                assert_eq!(decoded.is_account_writable(i), message.is_account_writable(i));
            }
        }
    }

    // -- Sanitation ---------------------------------------------------------

    #[test]
    fn header_counts_must_fit_key_table() {
        let keys = vec![key(1), key(2)];
        assert!(Message::new(MessageHeader::new(3, 0, 0), keys.clone(), [0; 32], vec![]).is_err());
        assert!(Message::new(MessageHeader::new(1, 2, 0), keys.clone(), [0; 32], vec![]).is_err());
        assert!(Message::new(MessageHeader::new(1, 0, 2), keys.clone(), [0; 32], vec![]).is_err());
        assert!(Message::new(MessageHeader::new(1, 1, 1), keys, [0; 32], vec![]).is_ok());
    }

    #[test]
    fn instruction_indices_must_be_in_range() {
        let bad_program = CompiledInstruction {
            program_id_index: 1,
            ..Default::default()
        };
        let bad_account = CompiledInstruction {
            program_id_index: 0,
            accounts: vec![0, 5],
            data: vec![],
        };
        let header = MessageHeader::new(1, 0, 0);
        assert!(Message::new(header, vec![key(1)], [0; 32], vec![bad_program]).is_err());
        let err = Message::new(header, vec![key(1)], [0; 32], vec![bad_account]).unwrap_err();
        assert!(err.to_string().contains("account index 5 out of range"));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = Message::new(
            MessageHeader::new(1, 0, 0),
            vec![key(1), key(1)],
            [0; 32],
            vec![],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate account key"));
    }

    // -- Derived views ------------------------------------------------------

    #[test]
    fn signer_and_writable_follow_header_positions() {
        // 2 signers (1 read-only), 3 non-signers (1 read-only).
        let message = Message::new(
            MessageHeader::new(2, 1, 1),
            (1..=5).map(key).collect(),
            [0; 32],
            vec![],
        )
        .unwrap();

        let signer: Vec<bool> = (0..5).map(|i| message.is_account_signer(i)).collect();
        let writable: Vec<bool> = (0..5).map(|i| message.is_account_writable(i)).collect();
        assert_eq!(signer, [true, true, false, false, false]);
        assert_eq!(writable, [true, false, true, true, false]);
        assert!(!message.is_account_writable(5));
        assert_eq!(message.signer_keys(), &[key(1), key(2)]);
    }

    #[test]
    fn program_ids_partition_key_table() {
        let message = Message::new(
            MessageHeader::new(1, 0, 2),
            (1..=4).map(key).collect(),
            [0; 32],
            vec![
                CompiledInstruction {
                    program_id_index: 3,
                    accounts: vec![0, 1],
                    data: vec![],
                },
                CompiledInstruction {
                    program_id_index: 2,
                    accounts: vec![0],
                    data: vec![],
                },
                CompiledInstruction {
                    program_id_index: 3,
                    accounts: vec![],
                    data: vec![1],
                },
            ],
        )
        .unwrap();

        assert_eq!(message.program_ids(), vec![key(3), key(4)]);
        assert_eq!(message.non_program_ids(), vec![key(1), key(2)]);
        assert!(message.is_program_id(2));
        assert!(!message.is_program_id(0));
    }

    // -- Compilation --------------------------------------------------------

    fn transfer(from: Pubkey, to: Pubkey) -> Instruction {
        Instruction::new(
            Pubkey::default(),
            vec![AccountMeta::new(from, true), AccountMeta::new(to, false)],
            vec![2, 0, 0, 0, 100, 0, 0, 0, 0, 0, 0, 0],
        )
    }

    #[test]
    fn compiled_account_order() {
        let from = key(1);
        let to = key(2);
        let message = Message::compile(&[transfer(from, to)], &from, [0xaa; 32]).unwrap();

        // from (signer+writable), to (writable), system program (read-only).
        assert_eq!(message.account_keys(), &[from, to, Pubkey::default()]);
        assert_eq!(*message.header(), MessageHeader::new(1, 0, 1));
        assert_eq!(message.recent_blockhash(), &[0xaa; 32]);

        let ix = &message.instructions()[0];
        assert_eq!(ix.program_id_index, 2);
        assert_eq!(ix.accounts, vec![0, 1]);
    }

    #[test]
    fn fee_payer_comes_first_and_is_deduplicated() {
        let payer = key(9);
        let signer = key(5);
        let readonly_signer = key(6);
        let ix = Instruction::new(
            key(7),
            vec![
                AccountMeta::new_readonly(key(8), false),
                AccountMeta::new_readonly(readonly_signer, true),
                AccountMeta::new(signer, true),
                AccountMeta::new_readonly(payer, true),
            ],
            vec![],
        );
        let message = Message::compile(&[ix], &payer, [0; 32]).unwrap();

        assert_eq!(
            message.account_keys(),
            &[payer, signer, readonly_signer, key(8), key(7)]
        );
        assert_eq!(*message.header(), MessageHeader::new(3, 1, 2));
        assert_eq!(message.instructions()[0].accounts, vec![3, 2, 1, 0]);
    }

    #[test]
    fn self_transfer_deduplicates_accounts() {
        let k = key(0xaa);
        let message = Message::compile(&[transfer(k, k)], &k, [0; 32]).unwrap();
        assert_eq!(message.account_keys().len(), 2);
        assert_eq!(message.header().num_required_signatures, 1);
        assert_eq!(message.instructions()[0].accounts, vec![0, 0]);
    }

    #[test]
    fn permission_bits_are_merged() {
        let payer = key(1);
        let shared = key(2);
        let a = Instruction::new(key(3), vec![AccountMeta::new_readonly(shared, false)], vec![]);
        let b = Instruction::new(key(3), vec![AccountMeta::new(shared, false)], vec![]);
        let message = Message::compile(&[a, b], &payer, [0; 32]).unwrap();
        let index = message.account_keys().iter().position(|k| *k == shared).unwrap();
        assert!(message.is_account_writable(index));
        assert!(!message.is_account_signer(index));
    }
}
