use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::iter::FusedIterator;

use anyhow::Error;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::constrain::Word;
use crate::decoder::{self, UndocumentedOpcodes};
use crate::exec::Pipeline;
use crate::instructions::{Instruction, InstructionTable};
use crate::peripherals::{Attached, Peripheral, PeripheralState};
use crate::state::{Machine, MachineState, Position};

/// What `execute` does when an opcode resolves to no instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownOpcode {
    #[default]
    Halt,
    /// Treat it as a one-cell no-op and keep going.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub memory_bits: u32,
    pub register_bits: u32,
    pub addresses: usize,
    pub register_names: Vec<String>,
    pub ip_register: String,
    pub instruction_register: String,
    pub on_unknown_opcode: UnknownOpcode,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            memory_bits: 4,
            register_bits: 4,
            addresses: 16,
            register_names: vec!["IP".into(), "IS".into()],
            ip_register: "IP".into(),
            instruction_register: "IS".into(),
            on_unknown_opcode: UnknownOpcode::Halt,
        }
    }
}

impl ProcessorConfig {
    /// Widths and size, with the default `IP`/`IS` registers followed by `extra`.
    pub fn new(memory_bits: u32, register_bits: u32, addresses: usize, extra: &[&str]) -> Self {
        let mut cfg = Self {
            memory_bits,
            register_bits,
            addresses,
            ..Self::default()
        };
        cfg.register_names
            .extend(extra.iter().map(|name| name.to_string()));
        cfg
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("memory must have at least one address")]
    NoAddresses,
    #[error("{what} width of {bits} bits is outside 1..=32")]
    BitWidth { what: &'static str, bits: u32 },
    #[error("register names must not be empty")]
    EmptyRegisterName,
    #[error("register `{0}` is declared more than once")]
    DuplicateRegister(String),
    #[error("{role} register `{name}` is not declared")]
    MissingRegister { role: &'static str, name: String },
    #[error("pipeline has no steps")]
    EmptyPipeline,
    #[error("opcode {0} is negative")]
    NegativeOpcode(Word),
    #[error("instruction {opcode} must occupy at least one cell")]
    ZeroIncrement { opcode: Word },
    #[error("mnemonic `{mnemonic}` is used by opcodes {first} and {second}")]
    DuplicateMnemonic {
        mnemonic: String,
        first: Word,
        second: Word,
    },
}

/// Failure raised by an instruction effect or a pipeline step. The underlying
/// error is kept as the source.
#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("pipeline step `{step}` failed in cycle {cycle}")]
    Step {
        step: String,
        cycle: u64,
        #[source]
        source: Error,
    },
    /// The state was built for a different processor, e.g. a restored
    /// snapshot.
    #[error("machine state does not fit this processor: {0}")]
    IncompatibleState(String),
}

/// Immutable description of a machine: geometry, registers, instruction
/// table, peripherals and pipeline.
pub struct Processor {
    config: ProcessorConfig,
    instructions: InstructionTable,
    peripherals: Vec<Box<dyn Attached>>,
    pipeline: Pipeline,
    undocumented: Option<Box<dyn UndocumentedOpcodes>>,
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("config", &self.config)
            .field("instructions", &self.instructions.len())
            .field(
                "peripherals",
                &self.peripherals.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("pipeline", &self.pipeline)
            .field("undocumented", &self.undocumented.is_some())
            .finish()
    }
}

pub struct ProcessorBuilder {
    config: ProcessorConfig,
    instructions: InstructionTable,
    peripherals: Vec<Box<dyn Attached>>,
    pipeline: Option<Pipeline>,
    undocumented: Option<Box<dyn UndocumentedOpcodes>>,
}

impl ProcessorBuilder {
    pub fn instructions(mut self, table: InstructionTable) -> Self {
        self.instructions = table;
        self
    }

    /// Peripherals are reset in the order they are attached.
    pub fn peripheral<P: Peripheral>(mut self, peripheral: P) -> Self {
        self.peripherals.push(Box::new(peripheral));
        self
    }

    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Fallback for opcodes missing from the table.
    pub fn undocumented<F>(self, resolver: F) -> Self
    where
        F: Fn(Word) -> Option<Instruction> + Send + Sync + 'static,
    {
        self.undocumented_resolver(resolver)
    }

    pub fn undocumented_resolver<U: UndocumentedOpcodes + 'static>(mut self, resolver: U) -> Self {
        self.undocumented = Some(Box::new(resolver));
        self
    }

    pub fn build(self) -> Result<Processor, ConfigError> {
        let cfg = &self.config;
        if cfg.addresses == 0 {
            return Err(ConfigError::NoAddresses);
        }
        for (what, bits) in [("memory", cfg.memory_bits), ("register", cfg.register_bits)] {
            if !(1..=32).contains(&bits) {
                return Err(ConfigError::BitWidth { what, bits });
            }
        }
        let mut seen = HashSet::new();
        for name in &cfg.register_names {
            if name.is_empty() {
                return Err(ConfigError::EmptyRegisterName);
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateRegister(name.clone()));
            }
        }
        for (role, name) in [
            ("instruction pointer", &cfg.ip_register),
            ("instruction", &cfg.instruction_register),
        ] {
            if !seen.contains(name.as_str()) {
                return Err(ConfigError::MissingRegister {
                    role,
                    name: name.clone(),
                });
            }
        }
        let mut mnemonics: HashMap<&str, Word> = HashMap::new();
        for (opcode, instr) in self.instructions.iter() {
            if opcode < 0 {
                return Err(ConfigError::NegativeOpcode(opcode));
            }
            if instr.ip_increment == 0 {
                return Err(ConfigError::ZeroIncrement { opcode });
            }
            if let Some(m) = instr.mnemonic.as_deref() {
                if let Some(&first) = mnemonics.get(m) {
                    return Err(ConfigError::DuplicateMnemonic {
                        mnemonic: m.to_string(),
                        first,
                        second: opcode,
                    });
                }
                mnemonics.insert(m, opcode);
            }
        }
        let pipeline = self.pipeline.unwrap_or_default();
        if pipeline.is_empty() {
            return Err(ConfigError::EmptyPipeline);
        }

        Ok(Processor {
            config: self.config,
            instructions: self.instructions,
            peripherals: self.peripherals,
            pipeline,
            undocumented: self.undocumented,
        })
    }
}

impl Processor {
    pub fn builder(config: ProcessorConfig) -> ProcessorBuilder {
        ProcessorBuilder {
            config,
            instructions: InstructionTable::new(),
            peripherals: Vec::new(),
            pipeline: None,
            undocumented: None,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn instructions(&self) -> &InstructionTable {
        &self.instructions
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn peripheral_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.peripherals.iter().map(|p| p.name())
    }

    /// Table lookup with the undocumented-opcode fallback.
    pub fn resolve(&self, opcode: Word) -> Option<Cow<'_, Instruction>> {
        decoder::resolve(&self.instructions, self.undocumented.as_deref(), opcode)
    }

    /// Zeroed registers and memory; every peripheral reset in attach order.
    pub fn new_state(&self) -> MachineState {
        let mut peripherals = PeripheralState::default();
        for p in &self.peripherals {
            p.reset_slot(&mut peripherals);
        }
        MachineState::new(
            self.config.addresses,
            self.config.memory_bits,
            &self.config.register_names,
            peripherals,
        )
    }

    pub fn reset(&self, state: &mut MachineState) {
        debug!("resetting machine state");
        *state = self.new_state();
    }

    pub fn machine<'a>(&'a self, state: &'a mut MachineState) -> Machine<'a> {
        Machine::new(self, state)
    }

    /// Load assembled cells from address 0, zeroing the rest of memory.
    pub fn load_program(&self, state: &mut MachineState, program: &[Word]) {
        self.machine(state).load_memory(program);
    }

    /// Run the pipeline step at the current position, then advance. Does
    /// nothing once the machine is halted. On error the position is left
    /// where it was.
    pub fn step(&self, state: &mut MachineState) -> Result<(), Trap> {
        if state.is_halted() {
            return Ok(());
        }
        self.check_state(state)?;
        let Position {
            pipeline_step,
            execution_step,
        } = state.position();
        let Some(step) = self.pipeline.get(pipeline_step) else {
            return Err(Trap::IncompatibleState(format!(
                "pipeline step {pipeline_step} of {}",
                self.pipeline.len()
            )));
        };
        trace!(step = step.name(), pipeline_step, execution_step, "pipeline step");
        step.call(&mut self.machine(state))
            .map_err(|source| Trap::Step {
                step: step.name().to_string(),
                cycle: execution_step,
                source,
            })?;
        if state.is_halted() {
            debug!(execution_step, "machine halted");
        }
        state.advance_pipeline(self.pipeline.len());
        Ok(())
    }

    /// Geometry and register file of `state` must match this processor.
    fn check_state(&self, state: &MachineState) -> Result<(), Trap> {
        let cfg = &self.config;
        let memory = state.memory();
        if memory.len() != cfg.addresses || memory.bits() != cfg.memory_bits {
            return Err(Trap::IncompatibleState(format!(
                "memory is {} cells of {} bits, expected {} of {}",
                memory.len(),
                memory.bits(),
                cfg.addresses,
                cfg.memory_bits
            )));
        }
        let names = state.registers().iter().map(|r| &r.name);
        if !names.eq(cfg.register_names.iter()) {
            return Err(Trap::IncompatibleState("register names differ".into()));
        }
        Ok(())
    }

    /// Step-by-step execution until the machine halts. Each item is one
    /// pipeline step; stop pulling to pause or cancel.
    pub fn run<'a>(&'a self, state: &'a mut MachineState) -> Run<'a> {
        Run {
            processor: self,
            state,
            failed: false,
        }
    }
}

/// Pull-driven execution cursor returned by [`Processor::run`].
///
/// Ends when the machine halts or after yielding a [`Trap`].
pub struct Run<'a> {
    processor: &'a Processor,
    state: &'a mut MachineState,
    failed: bool,
}

impl<'a> Run<'a> {
    pub fn state(&self) -> &MachineState {
        self.state
    }

    pub fn machine(&mut self) -> Machine<'_> {
        Machine::new(self.processor, self.state)
    }
}

impl Iterator for Run<'_> {
    type Item = Result<Position, Trap>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.state.is_halted() {
            return None;
        }
        match self.processor.step(self.state) {
            Ok(()) => Some(Ok(self.state.position())),
            Err(trap) => {
                self.failed = true;
                Some(Err(trap))
            }
        }
    }
}

impl FusedIterator for Run<'_> {}
