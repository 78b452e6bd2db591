use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::constrain::Word;
use crate::state::Machine;

/// What an instruction does once fetched. Errors propagate out of `step`/`run`.
pub type Effect = Arc<dyn Fn(&mut Machine<'_>) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone)]
pub struct Instruction {
    pub description: String,
    /// Cells occupied including the opcode itself.
    pub ip_increment: u32,
    pub execute: Effect,
    pub mnemonic: Option<String>,
    /// Pseudo-code shown in listings.
    pub code: Option<String>,
}

impl Instruction {
    pub fn new<F>(description: impl Into<String>, ip_increment: u32, execute: F) -> Self
    where
        F: Fn(&mut Machine<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            ip_increment,
            execute: Arc::new(execute),
            mnemonic: None,
            code: None,
        }
    }

    /// An instruction that does nothing when executed.
    pub fn nop(description: impl Into<String>, ip_increment: u32) -> Self {
        Self::new(description, ip_increment, |_| Ok(()))
    }

    pub fn with_mnemonic(mut self, mnemonic: impl Into<String>) -> Self {
        self.mnemonic = Some(mnemonic.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("description", &self.description)
            .field("ip_increment", &self.ip_increment)
            .field("mnemonic", &self.mnemonic)
            .field("code", &self.code)
            .finish_non_exhaustive()
    }
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Columns: u8 {
const NUMBER = 1 << 0;
const MNEMONIC = 1 << 1;
const INCREMENT = 1 << 2;
const DESCRIPTION = 1 << 3;
const CODE = 1 << 4;
}
}

impl Default for Columns {
    fn default() -> Self {
        Columns::NUMBER | Columns::INCREMENT | Columns::DESCRIPTION
    }
}

/// Opcode to instruction mapping. Dense tables are the special case of
/// keys `0..n`.
#[derive(Debug, Clone, Default)]
pub struct InstructionTable {
    entries: BTreeMap<Word, Instruction>,
}

impl InstructionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opcodes are assigned in order starting at 0.
    pub fn dense(instructions: impl IntoIterator<Item = Instruction>) -> Self {
        Self {
            entries: (0..).zip(instructions).collect(),
        }
    }

    pub fn insert(&mut self, opcode: Word, instruction: Instruction) -> Option<Instruction> {
        self.entries.insert(opcode, instruction)
    }

    pub fn with(mut self, opcode: Word, instruction: Instruction) -> Self {
        self.insert(opcode, instruction);
        self
    }

    pub fn get(&self, opcode: Word) -> Option<&Instruction> {
        self.entries.get(&opcode)
    }

    pub fn contains(&self, opcode: Word) -> bool {
        self.entries.contains_key(&opcode)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Word, &Instruction)> + '_ {
        self.entries.iter().map(|(op, instr)| (*op, instr))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mnemonic to opcode projection used by the assembler. Instructions
    /// without a mnemonic are not reachable by name.
    pub fn mnemonics(&self) -> HashMap<&str, Word> {
        self.entries
            .iter()
            .filter_map(|(op, instr)| instr.mnemonic.as_deref().map(|m| (m, *op)))
            .collect()
    }

    /// One tab-separated row per documented opcode, ascending.
    pub fn listing(&self, columns: Columns) -> Vec<String> {
        self.iter()
            .map(|(op, instr)| {
                let mut cells = Vec::new();
                if columns.contains(Columns::NUMBER) {
                    cells.push(op.to_string());
                }
                if columns.contains(Columns::MNEMONIC) {
                    cells.push(instr.mnemonic.clone().unwrap_or_default());
                }
                if columns.contains(Columns::INCREMENT) {
                    cells.push(instr.ip_increment.to_string());
                }
                if columns.contains(Columns::DESCRIPTION) {
                    cells.push(instr.description.clone());
                }
                if columns.contains(Columns::CODE) {
                    cells.push(instr.code.clone().unwrap_or_default());
                }
                cells.join("\t")
            })
            .collect()
    }
}
