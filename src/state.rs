use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::constrain::{self, Word};
use crate::memory::Memory;
use crate::peripherals::{Peripheral, PeripheralState};
use crate::processor::Processor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub name: String,
    pub value: Word,
}

/// Where a machine is within its pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Index of the next pipeline step to run.
    pub pipeline_step: usize,
    /// Completed pipeline cycles.
    pub execution_step: u64,
}

/// Mutable snapshot of one running machine. Created by
/// [`Processor::new_state`]; mutated through [`Machine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineState {
    memory: Memory,
    registers: Vec<Register>,
    #[serde(skip)]
    peripherals: PeripheralState,
    is_halted: bool,
    pipeline_step: usize,
    execution_step: u64,
}

impl MachineState {
    pub(crate) fn new(
        addresses: usize,
        memory_bits: u32,
        register_names: &[String],
        peripherals: PeripheralState,
    ) -> Self {
        Self {
            memory: Memory::new(addresses, memory_bits),
            registers: register_names
                .iter()
                .map(|name| Register {
                    name: name.clone(),
                    value: 0,
                })
                .collect(),
            peripherals,
            is_halted: false,
            pipeline_step: 0,
            execution_step: 0,
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    pub fn register(&self, name: &str) -> Option<Word> {
        self.registers
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.value)
    }

    pub fn peripherals(&self) -> &PeripheralState {
        &self.peripherals
    }

    pub fn is_halted(&self) -> bool {
        self.is_halted
    }

    pub fn pipeline_step(&self) -> usize {
        self.pipeline_step
    }

    pub fn execution_step(&self) -> u64 {
        self.execution_step
    }

    pub fn position(&self) -> Position {
        Position {
            pipeline_step: self.pipeline_step,
            execution_step: self.execution_step,
        }
    }

    /// Move to the next pipeline step; wrapping back to 0 completes a cycle.
    pub fn advance_pipeline(&mut self, pipeline_len: usize) {
        self.pipeline_step = (self.pipeline_step + 1) % pipeline_len;
        if self.pipeline_step == 0 {
            self.execution_step += 1;
        }
    }

    fn slot(&mut self, name: &str) -> &mut Word {
        match self.registers.iter_mut().find(|r| r.name == name) {
            Some(r) => &mut r.value,
            None => panic!("unknown register `{name}`"),
        }
    }
}

/// A processor paired with one of its states for the duration of a call.
/// This is what instruction effects and pipeline steps operate on.
pub struct Machine<'a> {
    processor: &'a Processor,
    state: &'a mut MachineState,
}

impl<'a> Machine<'a> {
    pub fn new(processor: &'a Processor, state: &'a mut MachineState) -> Self {
        Self { processor, state }
    }

    pub fn processor(&self) -> &'a Processor {
        self.processor
    }

    pub fn state(&self) -> &MachineState {
        self.state
    }

    /// Replace the state wholesale with a fresh one.
    pub fn reset(&mut self) {
        self.processor.reset(self.state);
    }

    /// # Panics
    ///
    /// If `name` is not one of the processor's registers.
    pub fn get_register(&self, name: &str) -> Word {
        match self.state.register(name) {
            Some(v) => v,
            None => panic!("unknown register `{name}`"),
        }
    }

    /// Masks to the register width; the instruction pointer is additionally
    /// wrapped into the address range.
    ///
    /// # Panics
    ///
    /// If `name` is not one of the processor's registers.
    pub fn set_register(&mut self, name: &str, value: Word) {
        let cfg = self.processor.config();
        let mut value = constrain::register_value(cfg.register_bits, value);
        if name == cfg.ip_register {
            value = constrain::address(cfg.addresses, value);
        }
        *self.state.slot(name) = value;
    }

    pub fn ip(&self) -> Word {
        self.get_register(&self.processor.config().ip_register)
    }

    pub fn set_ip(&mut self, value: Word) {
        let processor = self.processor;
        self.set_register(&processor.config().ip_register, value);
    }

    /// Value of the instruction register, i.e. the opcode being executed.
    pub fn opcode(&self) -> Word {
        self.get_register(&self.processor.config().instruction_register)
    }

    pub fn get_memory(&self, addr: Word) -> Word {
        self.state.memory.read(addr)
    }

    pub fn set_memory(&mut self, addr: Word, value: Word) {
        self.state.memory.write(addr, value);
    }

    pub fn load_memory(&mut self, values: &[Word]) {
        self.state.memory.load(values);
    }

    /// Overwrite registers in declaration order, zeroing the rest. Values are
    /// stored as given.
    pub fn load_registers(&mut self, values: &[Word]) {
        for (i, r) in self.state.registers.iter_mut().enumerate() {
            r.value = values.get(i).copied().unwrap_or(0);
        }
    }

    /// The `n`-th operand cell (1-based) of the instruction being executed.
    /// Assumes the pointer has already moved past the instruction.
    pub fn argument(&self, n: u32) -> Word {
        let increment = self
            .processor
            .resolve(self.opcode())
            .map_or(1, |instr| instr.ip_increment);
        let addr = self.ip() - (Word::from(increment) - Word::from(n));
        self.get_memory(addr)
    }

    pub fn halt(&mut self) {
        self.state.is_halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.state.is_halted
    }

    pub fn peripheral<P: Peripheral>(&self) -> Option<&P::State> {
        self.state.peripherals.get::<P::State>()
    }

    pub fn peripheral_mut<P: Peripheral>(&mut self) -> anyhow::Result<&mut P::State> {
        self.state
            .peripherals
            .get_mut::<P::State>()
            .ok_or_else(|| {
                anyhow!(
                    "peripheral state {} is not attached",
                    std::any::type_name::<P::State>()
                )
            })
    }
}
