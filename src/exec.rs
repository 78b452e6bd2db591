use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::constrain::Word;
use crate::processor::UnknownOpcode;
use crate::state::Machine;

pub type StepFn = Arc<dyn Fn(&mut Machine<'_>) -> anyhow::Result<()> + Send + Sync>;

/// One named phase of an instruction cycle.
#[derive(Clone)]
pub struct PipelineStep {
    name: Cow<'static, str>,
    run: StepFn,
}

impl PipelineStep {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, run: F) -> Self
    where
        F: Fn(&mut Machine<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, m: &mut Machine<'_>) -> anyhow::Result<()> {
        (self.run)(m)
    }
}

impl fmt::Debug for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PipelineStep").field(&self.name).finish()
    }
}

/// Ordered steps run one per `step` call, cycling.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    pub fn new(steps: Vec<PipelineStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&PipelineStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for Pipeline {
    /// fetch, increment, execute
    fn default() -> Self {
        Self::new(vec![
            PipelineStep::new("fetch", fetch),
            PipelineStep::new("increment", increment),
            PipelineStep::new("execute", execute),
        ])
    }
}

/// Copy the cell under the instruction pointer into the instruction register.
pub fn fetch(m: &mut Machine<'_>) -> anyhow::Result<()> {
    let opcode = m.get_memory(m.ip());
    let name = m.processor().config().instruction_register.as_str();
    m.set_register(name, opcode);
    Ok(())
}

/// Move the instruction pointer past the fetched instruction (one cell if
/// the opcode resolves to nothing).
pub fn increment(m: &mut Machine<'_>) -> anyhow::Result<()> {
    let by = m
        .processor()
        .resolve(m.opcode())
        .map_or(1, |instr| instr.ip_increment);
    m.set_ip(m.ip() + Word::from(by));
    Ok(())
}

/// Run the fetched instruction's effect. An unresolvable opcode halts the
/// machine unless the processor is configured to ignore it.
pub fn execute(m: &mut Machine<'_>) -> anyhow::Result<()> {
    let processor = m.processor();
    let opcode = m.opcode();
    match processor.resolve(opcode) {
        Some(instr) => (instr.execute)(m),
        None => {
            match processor.config().on_unknown_opcode {
                UnknownOpcode::Halt => {
                    debug!(opcode, ip = m.ip(), "unresolvable opcode, halting");
                    m.halt();
                }
                UnknownOpcode::Ignore => {
                    trace!(opcode, "unresolvable opcode ignored");
                }
            }
            Ok(())
        }
    }
}
