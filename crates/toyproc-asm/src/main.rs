use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use toyproc::disasm::listing;
use toyproc::{assemble_program, machines, source_map, Columns, Processor};
use toyproc_asm::{load_image, save_image, Image};

#[derive(Parser, Debug)]
#[command(author, version, about = "toyproc assembler and inspection tool", long_about = None)]
struct Cli {
    /// Subcommand
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble a source file into a JSON image
    Build {
        /// Target machine (resolves mnemonics)
        #[arg(short, long, default_value = "proc8103")]
        machine: String,
        /// Input assembly file
        #[arg(short, long)]
        input: PathBuf,
        /// Output image; cells are printed to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the cell index to line:column map of a source file
    Map {
        #[arg(value_name = "SOURCE")]
        input: PathBuf,
    },
    /// List a machine's instruction table
    Table {
        #[arg(short, long, default_value = "proc8103")]
        machine: String,
        /// Columns to show. Repeat or comma-separate.
        #[arg(long, value_enum, value_delimiter = ',', num_args = 1..)]
        columns: Vec<Column>,
    },
    /// Disassemble an image produced by `build`
    Disasm {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Column {
    Number,
    Mnemonic,
    Increment,
    Description,
    Code,
}

impl From<Column> for Columns {
    fn from(c: Column) -> Self {
        match c {
            Column::Number => Columns::NUMBER,
            Column::Mnemonic => Columns::MNEMONIC,
            Column::Increment => Columns::INCREMENT,
            Column::Description => Columns::DESCRIPTION,
            Column::Code => Columns::CODE,
        }
    }
}

fn processor(name: &str) -> Result<Processor> {
    let p = machines::by_name(name)
        .ok_or_else(|| anyhow!("unknown machine: {name} (try {:?})", machines::NAMES))??;
    Ok(p)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Build {
            machine,
            input,
            output,
        } => {
            let p = processor(&machine)?;
            let text = std::fs::read_to_string(&input)?;
            let program = assemble_program(p.instructions(), &text)?;
            match output {
                Some(path) => save_image(&path, &Image { machine, program })?,
                None => {
                    let cells: Vec<String> = program.bytes.iter().map(|c| c.to_string()).collect();
                    println!("{}", cells.join(" "));
                }
            }
        }
        Command::Map { input } => {
            let text = std::fs::read_to_string(&input)?;
            for (index, loc) in source_map(&text).iter() {
                println!("{index}\t{}:{}", loc.line + 1, loc.column + 1);
            }
        }
        Command::Table { machine, columns } => {
            let p = processor(&machine)?;
            let columns = if columns.is_empty() {
                Columns::default()
            } else {
                columns
                    .into_iter()
                    .fold(Columns::empty(), |acc, c| acc | Columns::from(c))
            };
            for row in p.instructions().listing(columns) {
                println!("{row}");
            }
        }
        Command::Disasm { image } => {
            let img = load_image(&image)?;
            let p = processor(&img.machine)?;
            let mut state = p.new_state();
            p.load_program(&mut state, img.cells());
            for line in listing(&p, state.memory()) {
                println!("{line}");
            }
        }
    }
    Ok(())
}
