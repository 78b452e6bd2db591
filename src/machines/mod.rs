//! Ready-made processor descriptions. These are plain data built on the
//! engine; they back the binaries and the end-to-end tests.

use crate::constrain::Word;
use crate::instructions::Instruction;
use crate::processor::{ConfigError, Processor};
use crate::state::Machine;

pub mod proc4002;
pub mod proc4004;
pub mod proc8103;
pub mod robo4000;

pub const NAMES: &[&str] = &["proc4002", "proc4004", "proc8103", "robo4000"];

pub fn by_name(name: &str) -> Option<Result<Processor, ConfigError>> {
    match name {
        "proc4002" => Some(proc4002::processor()),
        "proc4004" => Some(proc4004::processor()),
        "proc8103" => Some(proc8103::processor()),
        "robo4000" => Some(robo4000::processor()),
        _ => None,
    }
}

fn halt() -> Instruction {
    Instruction::new("Halt", 1, |m| {
        m.halt();
        Ok(())
    })
}

/// `reg = f(reg)`
fn unary(description: &str, reg: &'static str, f: fn(Word) -> Word) -> Instruction {
    Instruction::new(description, 1, move |m| {
        let v = m.get_register(reg);
        m.set_register(reg, f(v));
        Ok(())
    })
}

/// `R0 = f(R0, R1)`
fn binary(description: &str, f: fn(Word, Word) -> Word) -> Instruction {
    Instruction::new(description, 1, move |m| {
        let r0 = m.get_register("R0");
        let r1 = m.get_register("R1");
        m.set_register("R0", f(r0, r1));
        Ok(())
    })
}

/// Jump to the operand address when `taken` holds.
fn jump_if(description: &str, taken: fn(&Machine<'_>) -> bool) -> Instruction {
    Instruction::new(description, 2, move |m| {
        if taken(m) {
            let target = m.argument(1);
            m.set_ip(target);
        }
        Ok(())
    })
}

/// `reg = memory[operand]`
fn load(description: &str, reg: &'static str) -> Instruction {
    Instruction::new(description, 2, move |m| {
        let addr = m.argument(1);
        let v = m.get_memory(addr);
        m.set_register(reg, v);
        Ok(())
    })
}

/// `memory[operand] = reg`
fn store(description: &str, reg: &'static str) -> Instruction {
    Instruction::new(description, 2, move |m| {
        let addr = m.argument(1);
        let v = m.get_register(reg);
        m.set_memory(addr, v);
        Ok(())
    })
}
