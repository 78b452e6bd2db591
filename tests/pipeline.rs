use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use toyproc::{
    Instruction, InstructionTable, Machine, Pipeline, PipelineStep, Position, Processor,
    ProcessorConfig, Trap, UnknownOpcode,
};

fn halt(m: &mut Machine<'_>) -> anyhow::Result<()> {
    m.halt();
    Ok(())
}

fn counter_machine() -> Processor {
    let table = InstructionTable::new()
        .with(0, Instruction::nop("no operation", 1))
        .with(
            1,
            Instruction::new("R0 = R0 + 1", 1, |m| {
                let v = m.get_register("R0");
                m.set_register("R0", v + 1);
                Ok(())
            }),
        )
        .with(2, Instruction::new("stop", 1, halt));
    Processor::builder(ProcessorConfig::new(4, 4, 16, &["R0"]))
        .instructions(table)
        .build()
        .unwrap()
}

#[test]
fn one_cycle_is_three_steps() {
    let p = counter_machine();
    let mut state = p.new_state();
    p.load_program(&mut state, &[1, 1, 2]);

    p.step(&mut state).unwrap();
    assert_eq!(state.register("IS"), Some(1));
    assert_eq!(state.register("IP"), Some(0));
    p.step(&mut state).unwrap();
    assert_eq!(state.register("IP"), Some(1));
    assert_eq!(state.register("R0"), Some(0));
    p.step(&mut state).unwrap();
    assert_eq!(state.register("R0"), Some(1));
    assert_eq!(
        state.position(),
        Position {
            pipeline_step: 0,
            execution_step: 1
        }
    );
}

#[test]
fn run_stops_when_halted() {
    let p = counter_machine();
    let mut state = p.new_state();
    p.load_program(&mut state, &[1, 1, 1, 2]);

    let positions: Vec<Position> = p.run(&mut state).map(Result::unwrap).collect();

    assert_eq!(positions.len(), 12);
    assert_eq!(positions.last().unwrap().execution_step, 4);
    assert!(state.is_halted());
    assert_eq!(state.register("R0"), Some(3));
    assert_eq!(state.register("IP"), Some(4));
}

#[test]
fn run_can_be_paused_and_resumed() {
    let p = counter_machine();
    let mut state = p.new_state();
    p.load_program(&mut state, &[1, 1, 2]);

    assert_eq!(p.run(&mut state).take(4).count(), 4);
    assert_eq!(state.register("R0"), Some(1));
    assert_eq!(state.pipeline_step(), 1);

    assert_eq!(p.run(&mut state).count(), 5);
    assert_eq!(state.register("R0"), Some(2));
}

#[test]
fn halted_machine_does_not_move() {
    let p = counter_machine();
    let mut state = p.new_state();
    p.load_program(&mut state, &[2, 1]);
    while !state.is_halted() {
        p.step(&mut state).unwrap();
    }
    let before = state.clone();

    p.step(&mut state).unwrap();
    assert_eq!(p.run(&mut state).count(), 0);

    assert_eq!(state.position(), before.position());
    assert_eq!(state.registers(), before.registers());
}

#[test]
fn unknown_opcode_halts_and_leaves_registers_alone() {
    let p = counter_machine();
    let mut state = p.new_state();
    p.load_program(&mut state, &[9]);
    p.machine(&mut state).set_register("R0", 5);

    let steps = p.run(&mut state).count();

    assert_eq!(steps, 3);
    assert!(state.is_halted());
    assert_eq!(state.register("R0"), Some(5));
    assert_eq!(state.register("IS"), Some(9));
    // increment still moved past the unknown cell
    assert_eq!(state.register("IP"), Some(1));
}

#[test]
fn unknown_opcode_can_be_skipped() {
    let mut cfg = ProcessorConfig::new(4, 4, 16, &["R0"]);
    cfg.on_unknown_opcode = UnknownOpcode::Ignore;
    let table = InstructionTable::new()
        .with(1, Instruction::new("inc", 1, |m| {
            let v = m.get_register("R0");
            m.set_register("R0", v + 1);
            Ok(())
        }))
        .with(2, Instruction::new("stop", 1, halt));
    let p = Processor::builder(cfg).instructions(table).build().unwrap();
    let mut state = p.new_state();
    p.load_program(&mut state, &[9, 1, 9, 2]);

    for r in p.run(&mut state) {
        r.unwrap();
    }

    assert_eq!(state.register("R0"), Some(1));
    assert_eq!(state.execution_step(), 4);
}

#[test]
fn undocumented_opcodes_fall_back_to_resolver() {
    let table = InstructionTable::new().with(0, Instruction::new("stop", 1, halt));
    let p = Processor::builder(ProcessorConfig::new(4, 4, 16, &["R0"]))
        .instructions(table)
        .undocumented(|opcode| {
            (opcode >= 8).then(|| {
                Instruction::new("load opcode", 2, move |m| {
                    let arg = m.argument(1);
                    m.set_register("R0", opcode + arg);
                    Ok(())
                })
            })
        })
        .build()
        .unwrap();
    let mut state = p.new_state();
    p.load_program(&mut state, &[8, 3, 0]);

    assert_eq!(p.resolve(8).unwrap().ip_increment, 2);
    assert!(p.resolve(5).is_none());
    assert_eq!(p.run(&mut state).count(), 6);

    // 8 + 3, masked to four bits
    assert_eq!(state.register("R0"), Some(11));
    assert_eq!(state.register("IP"), Some(3));
}

#[test]
fn table_entries_shadow_the_fallback() {
    let table = InstructionTable::new().with(3, Instruction::nop("documented", 1));
    let p = Processor::builder(ProcessorConfig::default())
        .instructions(table)
        .undocumented(|_| Some(Instruction::nop("undocumented", 2)))
        .build()
        .unwrap();

    assert_eq!(p.resolve(3).unwrap().description, "documented");
    assert_eq!(p.resolve(4).unwrap().description, "undocumented");
}

#[test]
fn instruction_pointer_wraps_around_memory() {
    let table = InstructionTable::new().with(0, Instruction::nop("skip", 3));
    let p = Processor::builder(ProcessorConfig::default())
        .instructions(table)
        .build()
        .unwrap();
    let mut state = p.new_state();
    p.machine(&mut state).set_ip(15);

    for _ in 0..3 {
        p.step(&mut state).unwrap();
    }

    assert_eq!(state.register("IP"), Some(2));
}

#[test]
fn custom_pipeline_runs_in_order() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let pipeline = Pipeline::new(vec![
        PipelineStep::new("count", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
        PipelineStep::new("fetch", toyproc::exec::fetch),
        PipelineStep::new("execute", toyproc::exec::execute),
    ]);
    let table = InstructionTable::new().with(0, Instruction::new("stop", 1, halt));
    let p = Processor::builder(ProcessorConfig::default())
        .instructions(table)
        .pipeline(pipeline)
        .build()
        .unwrap();
    let mut state = p.new_state();

    let names: Vec<&str> = p.pipeline().steps().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["count", "fetch", "execute"]);
    assert_eq!(p.pipeline().get(1).map(|s| s.name()), Some("fetch"));
    assert!(p.pipeline().get(3).is_none());
    assert_eq!(p.run(&mut state).count(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // without an increment step the pointer never moves
    assert_eq!(state.register("IP"), Some(0));
}

#[test]
fn empty_pipeline_is_rejected() {
    let err = Processor::builder(ProcessorConfig::default())
        .pipeline(Pipeline::new(Vec::new()))
        .build()
        .unwrap_err();
    assert_eq!(err, toyproc::ConfigError::EmptyPipeline);
}

#[derive(Debug, thiserror::Error)]
#[error("division by zero")]
struct DivideByZero;

#[test]
fn effect_errors_surface_as_traps() {
    let table = InstructionTable::new()
        .with(0, Instruction::nop("no operation", 1))
        .with(
            1,
            Instruction::new("fail", 1, |m| {
                if m.get_register("R0") == 0 {
                    return Err(DivideByZero.into());
                }
                Ok(())
            }),
        );
    let p = Processor::builder(ProcessorConfig::new(4, 4, 16, &["R0"]))
        .instructions(table)
        .build()
        .unwrap();
    let mut state = p.new_state();
    p.load_program(&mut state, &[0, 1]);

    let results: Vec<_> = p.run(&mut state).collect();

    assert_eq!(results.len(), 6);
    let Err(Trap::Step { step, cycle, source }) = results.into_iter().last().unwrap() else {
        panic!("expected a trap");
    };
    assert_eq!(step, "execute");
    assert_eq!(cycle, 1);
    assert!(source.downcast_ref::<DivideByZero>().is_some());
    // the failing step is not consumed
    assert_eq!(state.pipeline_step(), 2);
    assert_eq!(state.execution_step(), 1);
    assert!(!state.is_halted());
}

#[test]
fn failing_step_can_be_retried() {
    let table = InstructionTable::new().with(
        0,
        Instruction::new("needs R0", 1, |m| {
            if m.get_register("R0") == 0 {
                bail!("R0 not set");
            }
            m.halt();
            Ok(())
        }),
    );
    let p = Processor::builder(ProcessorConfig::new(4, 4, 16, &["R0"]))
        .instructions(table)
        .build()
        .unwrap();
    let mut state = p.new_state();

    assert!(p.run(&mut state).any(|r| r.is_err()));
    p.machine(&mut state).set_register("R0", 1);
    p.step(&mut state).unwrap();

    assert!(state.is_halted());
    assert_eq!(state.execution_step(), 1);
}

#[test]
fn run_exposes_the_machine_between_steps() {
    let p = counter_machine();
    let mut state = p.new_state();
    p.load_program(&mut state, &[1, 1, 2]);

    let mut run = p.run(&mut state);
    run.next().unwrap().unwrap();
    assert_eq!(run.state().register("IS"), Some(1));
    run.machine().set_register("R0", 10);
    let rest = run.count();

    assert_eq!(rest, 8);
    assert_eq!(state.register("R0"), Some(12));
}

#[test]
fn missing_opcode_halts_within_one_cycle() {
    let table = InstructionTable::new().with(0, Instruction::new("stop", 1, halt));
    let p = Processor::builder(ProcessorConfig::new(8, 8, 256, &["R0", "R1"]))
        .instructions(table)
        .build()
        .unwrap();
    let mut state = p.new_state();
    p.load_program(&mut state, &[99, 0]);
    p.machine(&mut state).load_registers(&[0, 0, 4, 7]);

    for _ in 0..3 {
        p.step(&mut state).unwrap();
    }

    assert!(state.is_halted());
    assert_eq!(state.register("R0"), Some(4));
    assert_eq!(state.register("R1"), Some(7));
}
