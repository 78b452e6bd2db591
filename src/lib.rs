pub mod asm;
pub mod constrain;
pub mod decoder;
pub mod disasm;
pub mod exec;
pub mod instructions;
pub mod machines;
pub mod memory;
pub mod peripherals;
pub mod processor;
pub mod state;

pub use asm::{assemble, assemble_program, source_map, AssembleError, Program, SourceMap};
pub use constrain::Word;
pub use exec::{Pipeline, PipelineStep};
pub use instructions::{Columns, Instruction, InstructionTable};
pub use memory::{Memory, MemoryError};
pub use peripherals::{Peripheral, PeripheralState};
pub use processor::{ConfigError, Processor, ProcessorConfig, Run, Trap, UnknownOpcode};
pub use state::{Machine, MachineState, Position};
