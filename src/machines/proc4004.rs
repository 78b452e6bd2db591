//! 4-bit, two registers, LCD and speaker, with memory operands.

use super::{binary, halt, jump_if, load, store, unary};
use crate::instructions::{Instruction, InstructionTable};
use crate::peripherals::{Lcd, Speaker};
use crate::processor::{ConfigError, Processor, ProcessorConfig};

/// `reg <-> memory[operand]`
fn swap(description: &str, reg: &'static str) -> Instruction {
    Instruction::new(description, 2, move |m| {
        let addr = m.argument(1);
        let mem = m.get_memory(addr);
        let r = m.get_register(reg);
        m.set_memory(addr, r);
        m.set_register(reg, mem);
        Ok(())
    })
}

pub fn processor() -> Result<Processor, ConfigError> {
    let table = InstructionTable::dense([
        halt(),
        unary("Increment R0 (R0 = R0 + 1)", "R0", |r| r + 1),
        unary("Decrement R0 (R0 = R0 - 1)", "R0", |r| r - 1),
        unary("Increment R1 (R1 = R1 + 1)", "R1", |r| r + 1),
        unary("Decrement R1 (R1 = R1 - 1)", "R1", |r| r - 1),
        binary("Add (R0 = R0 + R1)", |a, b| a + b),
        binary("Subtract (R0 = R0 - R1)", |a, b| a - b),
        Instruction::new("Print R0 (numerical value is printed)", 2, |m| {
            let r0 = m.get_register("R0");
            Lcd.print_number(m.peripheral_mut::<Lcd>()?, r0);
            Ok(())
        }),
        jump_if("Jump to address <data> if R0 != 0", |m| {
            m.get_register("R0") != 0
        }),
        jump_if("Jump to address <data> if R0 == 0", |m| {
            m.get_register("R0") == 0
        }),
        load("Load value at address <data> into R0", "R0"),
        load("Load value at address <data> into R1", "R1"),
        store("Store R0 into address <data>", "R0"),
        store("Store R1 into address <data>", "R1"),
        swap("Swap R0 and address <data>", "R0"),
        swap("Swap R1 and address <data>", "R1"),
    ]);

    Processor::builder(ProcessorConfig::new(4, 4, 16, &["R0", "R1"]))
        .peripheral(Lcd)
        .peripheral(Speaker)
        .instructions(table)
        .build()
}
