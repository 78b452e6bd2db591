use std::borrow::Cow;

use crate::constrain::Word;
use crate::instructions::{Instruction, InstructionTable};

/// Fallback consulted for opcodes the table does not define.
pub trait UndocumentedOpcodes: Send + Sync {
    fn instruction(&self, opcode: Word) -> Option<Instruction>;
}

impl<F> UndocumentedOpcodes for F
where
    F: Fn(Word) -> Option<Instruction> + Send + Sync,
{
    fn instruction(&self, opcode: Word) -> Option<Instruction> {
        self(opcode)
    }
}

/// The only opcode lookup. Table entries win; otherwise the fallback (if any)
/// decides, and `None` means "no instruction".
pub fn resolve<'a>(
    table: &'a InstructionTable,
    fallback: Option<&dyn UndocumentedOpcodes>,
    opcode: Word,
) -> Option<Cow<'a, Instruction>> {
    if let Some(instr) = table.get(opcode) {
        return Some(Cow::Borrowed(instr));
    }
    fallback
        .and_then(|f| f.instruction(opcode))
        .map(Cow::Owned)
}
