use pretty_assertions::assert_eq;

use toyproc::peripherals::{Lcd, LcdState, Peripheral, Speaker, SpeakerState};
use toyproc::{
    ConfigError, Instruction, InstructionTable, MachineState, Memory, Processor, ProcessorConfig,
    Trap,
};

fn four_bit(extra: &[&str]) -> Processor {
    Processor::builder(ProcessorConfig::new(4, 4, 16, extra))
        .peripheral(Lcd)
        .peripheral(Speaker)
        .build()
        .unwrap()
}

#[test]
fn new_state_is_zeroed() {
    let p = four_bit(&["R0", "R1"]);
    let state = p.new_state();

    assert_eq!(state.memory().cells(), &[0; 16]);
    assert_eq!(state.memory().bits(), 4);
    let names: Vec<&str> = state.registers().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["IP", "IS", "R0", "R1"]);
    assert!(state.registers().iter().all(|r| r.value == 0));
    assert!(!state.is_halted());
    assert_eq!(state.pipeline_step(), 0);
    assert_eq!(state.execution_step(), 0);
}

#[test]
fn new_state_resets_every_peripheral() {
    let p = four_bit(&[]);
    let state = p.new_state();

    assert_eq!(state.peripherals().len(), 2);
    assert_eq!(state.peripherals().get::<LcdState>(), Some(&LcdState::default()));
    assert_eq!(
        state.peripherals().get::<SpeakerState>(),
        Some(&SpeakerState::default())
    );
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Log(Vec<&'static str>);

struct First;
struct Second;

impl Peripheral for First {
    type State = Log;
    fn name(&self) -> &'static str {
        "first"
    }
    fn reset(&self, state: &mut Log) {
        state.0.push("first");
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Counter(u32);

impl Peripheral for Second {
    type State = Counter;
    fn name(&self) -> &'static str {
        "second"
    }
    fn reset(&self, state: &mut Counter) {
        state.0 = 7;
    }
}

#[test]
fn peripherals_reset_in_attach_order_with_custom_reset() {
    let p = Processor::builder(ProcessorConfig::default())
        .peripheral(First)
        .peripheral(Second)
        .build()
        .unwrap();
    let state = p.new_state();

    let names: Vec<&str> = p.peripheral_names().collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(state.peripherals().get::<Log>(), Some(&Log(vec!["first"])));
    assert_eq!(state.peripherals().get::<Counter>(), Some(&Counter(7)));
}

#[test]
fn reset_replaces_state_wholesale() {
    let p = four_bit(&["R0"]);
    let mut state = p.new_state();
    {
        let mut m = p.machine(&mut state);
        m.set_register("R0", 9);
        m.set_memory(3, 4);
        Lcd.print_number(m.peripheral_mut::<Lcd>().unwrap(), 42);
        m.halt();
    }
    state.advance_pipeline(3);

    let mut m = p.machine(&mut state);
    assert_eq!(m.peripheral::<Lcd>().unwrap().output, "42");
    m.reset();

    assert_eq!(state.register("R0"), Some(0));
    assert_eq!(state.memory().read(3), 0);
    assert_eq!(state.peripherals().get::<LcdState>().unwrap().output, "");
    assert!(!state.is_halted());
    assert_eq!(state.pipeline_step(), 0);
}

#[test]
fn memory_access_wraps_and_masks() {
    let p = four_bit(&[]);
    let mut state = p.new_state();
    let mut m = p.machine(&mut state);

    m.set_memory(18, 0x1F);
    assert_eq!(m.get_memory(2), 0xF);
    assert_eq!(m.get_memory(-14), 0xF);
    m.set_memory(-1, -1);
    assert_eq!(m.get_memory(15), 15);
}

#[test]
fn load_memory_masks_and_zeroes_the_tail() {
    let p = four_bit(&[]);
    let mut state = p.new_state();
    let mut m = p.machine(&mut state);
    m.set_memory(10, 5);

    m.load_memory(&[1, 2, 17, -1]);

    let mut expected = vec![0i64; 16];
    expected[..4].copy_from_slice(&[1, 2, 1, 15]);
    assert_eq!(m.state().memory().cells(), expected.as_slice());
}

#[test]
fn load_memory_ignores_values_past_the_end() {
    let p = four_bit(&[]);
    let mut state = p.new_state();
    let values: Vec<i64> = (0..20).collect();

    p.load_program(&mut state, &values);

    assert_eq!(state.memory().read(15), 15);
    assert_eq!(state.memory().len(), 16);
}

#[test]
fn load_registers_is_unmasked_and_zeroes_the_rest() {
    let p = four_bit(&["R0", "R1"]);
    let mut state = p.new_state();
    let mut m = p.machine(&mut state);
    m.set_register("R1", 3);

    m.load_registers(&[1, 2, 300]);

    assert_eq!(m.get_register("IP"), 1);
    assert_eq!(m.get_register("IS"), 2);
    assert_eq!(m.get_register("R0"), 300);
    assert_eq!(m.get_register("R1"), 0);
}

#[test]
#[should_panic(expected = "unknown register `R9`")]
fn unknown_register_is_a_programming_error() {
    let p = four_bit(&[]);
    let mut state = p.new_state();
    p.machine(&mut state).set_register("R9", 1);
}

#[test]
fn argument_reads_operands_behind_the_pointer() {
    let table = InstructionTable::new().with(5, Instruction::nop("three cells", 3));
    let p = Processor::builder(ProcessorConfig::new(8, 8, 16, &[]))
        .instructions(table)
        .build()
        .unwrap();
    let mut state = p.new_state();
    p.load_program(&mut state, &[5, 11, 22, 0]);
    let mut m = p.machine(&mut state);
    // As after fetch + increment of the instruction at 0.
    m.set_register("IS", 5);
    m.set_ip(3);

    assert_eq!(m.argument(1), 11);
    assert_eq!(m.argument(2), 22);
}

#[test]
fn argument_wraps_around_memory() {
    let table = InstructionTable::new().with(1, Instruction::nop("two cells", 2));
    let p = Processor::builder(ProcessorConfig::default())
        .instructions(table)
        .build()
        .unwrap();
    let mut state = p.new_state();
    let mut m = p.machine(&mut state);
    m.set_memory(15, 1);
    m.set_memory(0, 9);
    m.set_register("IS", 1);
    m.set_ip(1);

    assert_eq!(m.argument(1), 9);
    m.set_ip(0);
    assert_eq!(m.argument(1), 1);
}

#[test]
fn advance_pipeline_counts_cycles() {
    let p = four_bit(&[]);
    let mut state = p.new_state();

    state.advance_pipeline(3);
    state.advance_pipeline(3);
    assert_eq!((state.pipeline_step(), state.execution_step()), (2, 0));
    state.advance_pipeline(3);
    assert_eq!((state.pipeline_step(), state.execution_step()), (0, 1));

    state.advance_pipeline(1);
    assert_eq!((state.pipeline_step(), state.execution_step()), (0, 2));
}

#[test]
fn snapshot_serializes_without_peripherals() {
    let p = four_bit(&["R0"]);
    let mut state = p.new_state();
    p.machine(&mut state).set_register("R0", 6);

    let json = serde_json::to_string(&state).unwrap();
    let back: toyproc::MachineState = serde_json::from_str(&json).unwrap();

    assert_eq!(back.register("R0"), Some(6));
    assert_eq!(back.memory(), state.memory());
    assert!(back.peripherals().is_empty());
}

#[test]
fn builder_rejects_bad_descriptions() {
    let err = |cfg: ProcessorConfig| Processor::builder(cfg).build().unwrap_err();

    assert_eq!(err(ProcessorConfig::new(4, 4, 0, &[])), ConfigError::NoAddresses);
    assert_eq!(
        err(ProcessorConfig::new(0, 4, 16, &[])),
        ConfigError::BitWidth { what: "memory", bits: 0 }
    );
    assert_eq!(
        err(ProcessorConfig::new(4, 33, 16, &[])),
        ConfigError::BitWidth { what: "register", bits: 33 }
    );
    assert_eq!(
        err(ProcessorConfig::new(4, 4, 16, &["IP"])),
        ConfigError::DuplicateRegister("IP".into())
    );
    let mut cfg = ProcessorConfig::default();
    cfg.ip_register = "PC".into();
    assert_eq!(
        err(cfg),
        ConfigError::MissingRegister {
            role: "instruction pointer",
            name: "PC".into()
        }
    );

    let dup = InstructionTable::new()
        .with(1, Instruction::nop("a", 1).with_mnemonic("NOP"))
        .with(2, Instruction::nop("b", 1).with_mnemonic("NOP"));
    let e = Processor::builder(ProcessorConfig::default())
        .instructions(dup)
        .build()
        .unwrap_err();
    assert_eq!(
        e,
        ConfigError::DuplicateMnemonic {
            mnemonic: "NOP".into(),
            first: 1,
            second: 2
        }
    );

    let zero = InstructionTable::new().with(0, Instruction::nop("empty", 0));
    let e = Processor::builder(ProcessorConfig::default())
        .instructions(zero)
        .build()
        .unwrap_err();
    assert_eq!(e, ConfigError::ZeroIncrement { opcode: 0 });
}

#[test]
fn config_deserializes_with_defaults() {
    let cfg: ProcessorConfig =
        serde_json::from_str(r#"{"memory_bits":8,"register_bits":8,"addresses":256}"#).unwrap();
    assert_eq!(cfg.register_names, vec!["IP".to_string(), "IS".to_string()]);
    assert_eq!(cfg.on_unknown_opcode, toyproc::UnknownOpcode::Halt);
}

fn restored(p: &Processor, edit: impl FnOnce(&mut serde_json::Value)) -> MachineState {
    let mut json = serde_json::to_value(p.new_state()).unwrap();
    edit(&mut json);
    serde_json::from_value(json).unwrap()
}

#[test]
fn snapshot_from_a_longer_pipeline_traps_instead_of_panicking() {
    let p = four_bit(&["R0"]);
    let mut state = restored(&p, |json| json["pipeline_step"] = 7.into());

    let err = p.step(&mut state).unwrap_err();

    assert!(matches!(err, Trap::IncompatibleState(_)), "{err:?}");
    assert_eq!(state.pipeline_step(), 7);
    assert_eq!(p.run(&mut state).filter(Result::is_err).count(), 1);
}

#[test]
fn snapshot_of_another_geometry_traps() {
    let p = four_bit(&["R0"]);
    let other = Processor::builder(ProcessorConfig::new(8, 8, 32, &["R0"]))
        .build()
        .unwrap();
    let mut state = other.new_state();

    assert!(matches!(p.step(&mut state), Err(Trap::IncompatibleState(_))));

    let mut state = restored(&p, |json| json["registers"][2]["name"] = "R7".into());
    assert!(matches!(p.step(&mut state), Err(Trap::IncompatibleState(_))));
}

#[test]
fn empty_memory_snapshot_is_rejected() {
    let p = four_bit(&[]);
    let mut json = serde_json::to_value(p.new_state()).unwrap();
    json["memory"]["cells"] = serde_json::json!([]);
    assert!(serde_json::from_value::<MachineState>(json).is_err());

    let err = serde_json::from_str::<Memory>(r#"{"cells":[0],"bits":0}"#).unwrap_err();
    assert!(err.to_string().contains("outside 1..=32"), "{err}");
}

#[test]
fn restored_memory_is_masked() {
    let memory: Memory = serde_json::from_str(r#"{"cells":[255,-1,3],"bits":4}"#).unwrap();
    assert_eq!(memory.cells(), &[15, 15, 3]);
}
