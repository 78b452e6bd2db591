//! 8-bit machine with mnemonics, a downward-growing stack at `SP`, an
//! I/O `PORT` register, a pixel display and a few undocumented opcodes.

use rand::seq::IteratorRandom;
use rand::Rng;

use super::{binary, halt, jump_if, load, store, unary};
use crate::constrain::Word;
use crate::instructions::{Instruction, InstructionTable};
use crate::peripherals::{Fire, Lcd, PixelDisplay, Speaker};
use crate::processor::{ConfigError, Processor, ProcessorConfig};
use crate::state::Machine;

/// `R0/R1 = operand` (immediate)
fn load_immediate(reg: &'static str) -> Instruction {
    Instruction::new(format!("Load (direct) <data> into {reg}"), 2, move |m| {
        let v = m.argument(1);
        m.set_register(reg, v);
        Ok(())
    })
}

/// `reg = memory[SP + operand]`
fn load_stack(reg: &'static str) -> Instruction {
    Instruction::new(
        format!("Load value at address SP+[data] into {reg}"),
        2,
        move |m| {
            let addr = m.get_register("SP") + m.argument(1);
            let v = m.get_memory(addr);
            m.set_register(reg, v);
            Ok(())
        },
    )
}

/// `memory[SP + operand] = reg`
fn store_stack(reg: &'static str) -> Instruction {
    Instruction::new(format!("Store {reg} at address SP+[data]"), 2, move |m| {
        let addr = m.get_register("SP") + m.argument(1);
        let v = m.get_register(reg);
        m.set_memory(addr, v);
        Ok(())
    })
}

fn push(m: &mut Machine<'_>, value: Word) {
    let sp = m.get_register("SP") - 1;
    m.set_register("SP", sp);
    m.set_memory(sp, value);
}

fn pop(m: &mut Machine<'_>) -> Word {
    let sp = m.get_register("SP");
    let v = m.get_memory(sp);
    m.set_register("SP", sp + 1);
    v
}

fn table() -> InstructionTable {
    let ops = [
        (0, halt(), "HALT"),
        (1, unary("Increment (R0 = R0 + 1)", "R0", |r| r + 1), "INC"),
        (2, unary("Decrement (R0 = R0 - 1)", "R0", |r| r - 1), "DEC"),
        (3, binary("Add (R0 = R0 + R1)", |a, b| a + b), "ADD"),
        (4, binary("Subtract (R0 = R0 - R1)", |a, b| a - b), "SUB"),
        (5, binary("Multiply (R0 = R0 * R1)", |a, b| a * b), "MUL"),
        (
            6,
            binary("Integer Divide (R0 = R0 / R1)", |a, b| {
                a.checked_div(b).unwrap_or(0)
            }),
            "DIV",
        ),
        (
            7,
            binary("Modulo (R0 = R0 % R1)", |a, b| a.checked_rem(b).unwrap_or(0)),
            "MOD",
        ),
        (8, binary("Shift Left (R0 = R0 << R1)", |a, b| a << (b & 31)), "SHL"),
        (9, binary("Shift Right (R0 = R0 >> R1)", |a, b| a >> (b & 31)), "SHR"),
        (10, binary("Bitwise AND (R0 = R0 & R1)", |a, b| a & b), "AND"),
        (11, binary("Bitwise OR (R0 = R0 | R1)", |a, b| a | b), "OR"),
        (12, binary("Bitwise XOR (R0 = R0 ^ R1)", |a, b| a ^ b), "XOR"),
        (13, unary("Bitwise NOT (R0 = ~R0)", "R0", |r| !r), "NOT"),
        (14, binary("Minimum (R0 = Lesser of R0, R1)", Word::min), "MIN"),
        (15, binary("Maximum (R0 = Greater of R0, R1)", Word::max), "MAX"),
        (
            16,
            Instruction::new("Swap the values of R0, R1", 1, |m| {
                let r0 = m.get_register("R0");
                let r1 = m.get_register("R1");
                m.set_register("R0", r1);
                m.set_register("R1", r0);
                Ok(())
            }),
            "SWAP",
        ),
        (17, load_immediate("R0"), "LDR0"),
        (18, load_immediate("R1"), "LDR1"),
        (19, load("Load (indirect) value at address <data> into R0", "R0"), "LIR0"),
        (20, load("Load (indirect) value at address <data> into R1", "R1"), "LIR1"),
        (21, store("Store R0 into address <data>", "R0"), "SR0"),
        (22, store("Store R1 into address <data>", "R1"), "SR1"),
        (23, load_stack("R0"), "LSR0"),
        (24, load_stack("R1"), "LSR1"),
        (25, store_stack("R0"), "SSR0"),
        (26, store_stack("R1"), "SSR1"),
        (
            32,
            Instruction::new("Compare R0 with value at address [data]", 2, |m| {
                let addr = m.argument(1);
                let equal = m.get_register("R0") == m.get_memory(addr);
                m.set_register("R0", Word::from(equal));
                Ok(())
            }),
            "CMP",
        ),
        (33, jump_if("Jump to address <data>", |_| true), "JMP"),
        (
            34,
            jump_if("Jump to address <data> if R0 == 0", |m| {
                m.get_register("R0") == 0
            }),
            "JZ",
        ),
        (
            35,
            jump_if("Jump to address <data> if R0 != 0", |m| {
                m.get_register("R0") != 0
            }),
            "JNZ",
        ),
        (
            36,
            jump_if("Jump to address <data> if R0 == R1", |m| {
                m.get_register("R0") == m.get_register("R1")
            }),
            "JE",
        ),
        (
            37,
            jump_if("Jump to address <data> if R0 != R1", |m| {
                m.get_register("R0") != m.get_register("R1")
            }),
            "JNE",
        ),
        (
            38,
            jump_if("Jump to address <data> if R0 < R1", |m| {
                m.get_register("R0") < m.get_register("R1")
            }),
            "JB",
        ),
        (
            39,
            jump_if("Jump to address <data> if R0 <= R1", |m| {
                m.get_register("R0") <= m.get_register("R1")
            }),
            "JZP",
        ),
        (
            40,
            jump_if("Jump to address <data> if (PORT & R0) != 0", |m| {
                m.get_register("PORT") & m.get_register("R0") != 0
            }),
            "JNZP",
        ),
        (
            41,
            jump_if("Jump to address <data> if (PORT & R0) == 0", |m| {
                m.get_register("PORT") & m.get_register("R0") == 0
            }),
            "JPZ",
        ),
        (
            48,
            Instruction::new("Pop (into R0)", 1, |m| {
                let v = pop(m);
                m.set_register("R0", v);
                Ok(())
            }),
            "POP",
        ),
        (
            49,
            Instruction::new("Return (Pop into IP)", 1, |m| {
                let v = pop(m);
                m.set_ip(v);
                Ok(())
            }),
            "RET",
        ),
        (
            50,
            Instruction::new("Push R0", 1, |m| {
                let r0 = m.get_register("R0");
                push(m, r0);
                Ok(())
            }),
            "PUSH",
        ),
        (
            51,
            Instruction::new("Call function at address [data] (Push IP and Jump)", 2, |m| {
                let target = m.argument(1);
                let ret = m.ip();
                push(m, ret);
                m.set_ip(target);
                Ok(())
            }),
            "CALL",
        ),
        (
            64,
            Instruction::new("Print R0 as unsigned integer", 1, |m| {
                let r0 = m.get_register("R0");
                Lcd.print_number(m.peripheral_mut::<Lcd>()?, r0);
                Ok(())
            }),
            "PRINT",
        ),
        (
            65,
            Instruction::new("Print R0 as ASCII character", 1, |m| {
                let r0 = m.get_register("R0");
                Lcd.print_ascii(m.peripheral_mut::<Lcd>()?, r0);
                Ok(())
            }),
            "PRINTC",
        ),
        (
            66,
            Instruction::new("Play a sound (R0 specifies the sound)", 1, |m| {
                let r0 = m.get_register("R0");
                Speaker.sound(m.peripheral_mut::<Speaker>()?, r0);
                Ok(())
            }),
            "SOUND",
        ),
        (
            67,
            Instruction::new("Plot pixel <data> at coordinate R0, R1", 2, |m| {
                let x = m.get_register("R0");
                let y = m.get_register("R1");
                let color = m.argument(1);
                PixelDisplay.plot(m.peripheral_mut::<PixelDisplay>()?, x, y, color);
                Ok(())
            }),
            "PLOT",
        ),
    ];

    ops.into_iter()
        .fold(InstructionTable::new(), |table, (opcode, instr, mnemonic)| {
            table.with(opcode, instr.with_mnemonic(mnemonic))
        })
}

fn random_byte() -> Word {
    rand::thread_rng().gen_range(0..256)
}

/// Execute a documented instruction picked at random, stepping over the
/// operand cells it would have had.
fn random_instruction(m: &mut Machine<'_>) -> anyhow::Result<()> {
    let Some((_, instr)) = m
        .processor()
        .instructions()
        .iter()
        .choose(&mut rand::thread_rng())
    else {
        return Ok(());
    };
    let extra = Word::from(instr.ip_increment) - 1;
    if extra > 0 {
        m.set_ip(m.ip() + extra);
    }
    (instr.execute)(m)
}

/// 27 randomises R0, 28..=31 write a random byte to a random address,
/// 42 sets the machine on fire, 43..=47 run a random documented
/// instruction and 68..=255 print `Error`. Everything else undefined halts.
fn undocumented(opcode: Word) -> Option<Instruction> {
    match opcode {
        27 => Some(Instruction::new("Undefined", 1, |m| {
            m.set_register("R0", random_byte());
            Ok(())
        })),
        28..=31 => Some(Instruction::new("Undefined", 1, |m| {
            m.set_memory(random_byte(), random_byte());
            Ok(())
        })),
        42 => Some(Instruction::new("Undefined", 1, |m| {
            Fire.catch_fire(m.peripheral_mut::<Fire>()?);
            Ok(())
        })),
        43..=47 => Some(Instruction::new("Undefined", 1, random_instruction)),
        68..=255 => Some(Instruction::new("Undefined", 1, |m| {
            Lcd.print_str(m.peripheral_mut::<Lcd>()?, "Error");
            Ok(())
        })),
        _ => None,
    }
}

pub fn processor() -> Result<Processor, ConfigError> {
    Processor::builder(ProcessorConfig::new(8, 8, 256, &["R0", "R1", "SP", "PORT"]))
        .peripheral(Lcd)
        .peripheral(Speaker)
        .peripheral(PixelDisplay)
        .peripheral(Fire)
        .instructions(table())
        .undocumented(undocumented)
        .build()
}
