use crate::constrain::Word;
use crate::memory::Memory;
use crate::processor::Processor;

/// Render the instruction at `addr` and return how many cells it spans.
/// Operands are read with address wrap; unresolvable cells render as data.
pub fn fmt_at(processor: &Processor, memory: &Memory, addr: Word) -> (String, usize) {
    let opcode = memory.read(addr);
    let Some(instr) = processor.resolve(opcode) else {
        return (format!(".data {opcode}"), 1);
    };
    let mut text = instr
        .mnemonic
        .clone()
        .unwrap_or_else(|| opcode.to_string());
    for n in 1..Word::from(instr.ip_increment) {
        text.push(' ');
        text.push_str(&memory.read(addr + n).to_string());
    }
    (text, instr.ip_increment as usize)
}

/// Linear sweep from address 0 to the end of memory, one line per instruction.
pub fn listing(processor: &Processor, memory: &Memory) -> Vec<String> {
    let width = memory.len().saturating_sub(1).to_string().len();
    let mut out = Vec::new();
    let mut addr = 0usize;
    while addr < memory.len() {
        let (text, cells) = fmt_at(processor, memory, addr as Word);
        out.push(format!("{addr:>width$}: {text}"));
        addr += cells;
    }
    out
}
