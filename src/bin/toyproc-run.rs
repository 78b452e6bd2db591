use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use toyproc::disasm::fmt_at;
use toyproc::peripherals::{FireState, LcdState, PixelState, RobotState, SpeakerState};
use toyproc::{assemble, machines, Word};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run a program on one of the toyproc demo machines"
)]
struct Opts {
    /// Machine to run on (proc4002, proc4004, proc8103, robo4000)
    #[arg(short, long, default_value = "proc8103")]
    machine: String,
    /// Maximum pipeline steps before giving up
    #[arg(long, default_value_t = 100_000usize)]
    max_steps: usize,
    /// Print each instruction as it is fetched
    #[arg(long)]
    trace: bool,
    /// Treat the input as whitespace-separated decimal cells instead of assembly
    #[arg(long)]
    raw: bool,
    #[arg(value_name = "SOURCE")]
    input: String,
}

fn parse_cells(text: &str) -> Result<Vec<Word>> {
    text.split_whitespace()
        .map(|t| t.parse::<Word>().with_context(|| format!("bad cell: {t}")))
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let processor = machines::by_name(&opts.machine)
        .ok_or_else(|| anyhow!("unknown machine: {} (try {:?})", opts.machine, machines::NAMES))??;

    let text = std::fs::read_to_string(&opts.input)?;
    let program = if opts.raw {
        parse_cells(&text)?
    } else {
        assemble(processor.instructions(), &text)?
    };

    let mut state = processor.new_state();
    processor.load_program(&mut state, &program);

    let mut run = processor.run(&mut state);
    for _ in 0..opts.max_steps {
        if opts.trace && run.state().pipeline_step() == 0 && !run.state().is_halted() {
            let m = run.machine();
            let (text, _) = fmt_at(m.processor(), m.state().memory(), m.ip());
            println!("{:>5} {:>4}: {text}", m.state().execution_step(), m.ip());
        }
        match run.next() {
            Some(Ok(_)) => {}
            Some(Err(trap)) => {
                eprintln!("TRAP: {trap:?}");
                break;
            }
            None => break,
        }
    }

    if !state.is_halted() {
        eprintln!("not halted after {} steps", opts.max_steps);
    }
    for r in state.registers() {
        println!("{} = {}", r.name, r.value);
    }
    let slots = state.peripherals();
    if let Some(lcd) = slots.get::<LcdState>() {
        println!("lcd: {}", lcd.output);
    }
    if let Some(speaker) = slots.get::<SpeakerState>() {
        println!("speaker: {} beeps", speaker.beeps);
    }
    if let Some(robot) = slots.get::<RobotState>() {
        println!(
            "robot: row {} column {} heading {:?}",
            robot.row, robot.column, robot.heading
        );
    }
    if let Some(display) = slots.get::<PixelState>() {
        for (x, y, color) in display.lit() {
            println!("pixel ({x}, {y}) = {color}");
        }
    }
    if let Some(fire) = slots.get::<FireState>() {
        if fire.on_fire {
            println!("the machine is on fire");
        }
    }

    Ok(())
}
