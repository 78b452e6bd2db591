//! 4-bit robot controller.

use super::halt;
use crate::instructions::{Instruction, InstructionTable};
use crate::peripherals::{Robot, Speaker};
use crate::processor::{ConfigError, Processor, ProcessorConfig};

pub fn processor() -> Result<Processor, ConfigError> {
    let table = InstructionTable::dense([
        halt(),
        Instruction::new("Move Forward", 1, |m| {
            Robot.advance(m.peripheral_mut::<Robot>()?, 1);
            Ok(())
        }),
        Instruction::new("Turn Right", 1, |m| {
            Robot.turn_right(m.peripheral_mut::<Robot>()?);
            Ok(())
        }),
        Instruction::new("Turn Left", 1, |m| {
            Robot.turn_left(m.peripheral_mut::<Robot>()?);
            Ok(())
        }),
    ]);

    Processor::builder(ProcessorConfig::new(4, 4, 16, &["R"]))
        .peripheral(Robot)
        .peripheral(Speaker)
        .instructions(table)
        .build()
}
