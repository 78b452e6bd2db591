//! 4-bit, one register, LCD. Opcodes 3..=6 are documented no-ops.

use super::{halt, unary};
use crate::instructions::{Instruction, InstructionTable};
use crate::peripherals::Lcd;
use crate::processor::{ConfigError, Processor, ProcessorConfig};

pub fn processor() -> Result<Processor, ConfigError> {
    let table = InstructionTable::dense([
        halt().with_code("halt"),
        unary("Increment R (R = R + 1)", "R", |r| r + 1).with_code("R++"),
        unary("Decrement R (R = R - 1)", "R", |r| r - 1).with_code("R--"),
        Instruction::nop("N/A", 1),
        Instruction::nop("N/A", 1),
        Instruction::nop("N/A", 1),
        Instruction::nop("N/A", 1),
        Instruction::new("Print the contents of R", 1, |m| {
            let r = m.get_register("R");
            Lcd.print_number(m.peripheral_mut::<Lcd>()?, r);
            Ok(())
        })
        .with_code("print(R)"),
    ]);

    Processor::builder(ProcessorConfig::new(4, 4, 16, &["R"]))
        .peripheral(Lcd)
        .instructions(table)
        .build()
}
