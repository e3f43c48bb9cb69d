use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use tracing::{Level, info};

/// Compile a Teeny Tiny program into C.
#[derive(Parser, Debug)]
#[command(name = "rteenyc", version, about, long_about = None)]
struct Args {
  /// Source file to compile.
  input: PathBuf,

  /// Where to write the generated C program.
  #[arg(short, long, default_value = "out.c")]
  output: PathBuf,

  /// Print the generated C program instead of writing it.
  #[arg(long)]
  stdout: bool,

  /// Dump the token stream instead of compiling.
  #[arg(long, conflicts_with = "stdout")]
  tokens: bool,

  /// Increase log verbosity (-v info, -vv debug, -vvv trace).
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,
}

fn main() {
  let args = Args::parse();

  let level = match args.verbose {
    0 => Level::WARN,
    1 => Level::INFO,
    2 => Level::DEBUG,
    _ => Level::TRACE,
  };
  tracing_subscriber::fmt()
    .with_max_level(level)
    .with_writer(std::io::stderr)
    .init();

  info!(input = %args.input.display(), "compiling");
  if let Err(err) = run(&args) {
    eprintln!("{err}");
    process::exit(1);
  }
}

fn run(args: &Args) -> rteenyc::CompileResult<()> {
  if args.tokens {
    let source = rteenyc::read_source(&args.input)?;
    for token in rteenyc::Lexer::new(&source).tokenize()? {
      println!("{:>4} {:<9} {:?}", token.line, token.kind, token.text);
    }
    return Ok(());
  }

  if args.stdout {
    let source = rteenyc::read_source(&args.input)?;
    print!("{}", rteenyc::compile(&source)?);
    return Ok(());
  }

  rteenyc::compile_file(&args.input, &args.output)?;
  println!(
    "Compiled {} -> {}",
    args.input.display(),
    args.output.display()
  );
  Ok(())
}
