//! bytesim - CLI Entry Point
//!
//! Commands:
//! - `bytesim run <program>` - Run an .asm file until HALT
//! - `bytesim check <program>` - Parse a program and report the first error
//! - `bytesim list <program>` - Print the canonical listing
//! - `bytesim shell` - Interactive BIOS prompt (the default)

use bytesim::{listing, Cpu, CpuConfig, Program, ProgramError};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};

#[derive(Parser)]
#[command(name = "bytesim")]
#[command(version = "0.1.0")]
#[command(about = "A minimal 8-bit computer with a line-oriented assembly interpreter")]
struct Cli {
    /// Start with per-instruction trace enabled
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Number of memory cells
    #[arg(long, global = true, default_value = "256")]
    memory_size: usize,
    /// Deepest IF nesting accepted on one line
    #[arg(long, global = true, default_value = "16")]
    max_nesting: usize,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the .asm file to execute
        program: String,
        /// Print the final machine state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a program without running it
    Check {
        /// Path to the .asm file
        program: String,
    },
    /// Print the canonical listing of a program
    List {
        /// Path to the .asm file
        program: String,
    },
    /// Interactive BIOS prompt
    Shell,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = CpuConfig {
        memory_size: cli.memory_size,
        max_nesting: cli.max_nesting,
        verbose: cli.verbose,
    };
    log::debug!("configuration: {:?}", config);

    match cli.command {
        Some(Commands::Run { program, json }) => run_program(&program, config, json),
        Some(Commands::Check { program }) => check_program(&program, config),
        Some(Commands::List { program }) => list_program(&program, config),
        Some(Commands::Shell) | None => power_on(config),
    }
}

fn load_or_exit(path: &str, config: CpuConfig) -> Program {
    match Program::load(path, config.max_nesting) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_program(path: &str, config: CpuConfig, json: bool) {
    let program = load_or_exit(path, config);
    let mut cpu = Cpu::new(config);

    println!("Running program: {}", path);
    let executed = match program.run(&mut cpu) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!();
    println!("Instructions: {}", executed);
    println!("State: {:?}", cpu.state);
    print_registers(&cpu);

    if json {
        match serde_json::to_string_pretty(&cpu.snapshot()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn check_program(path: &str, config: CpuConfig) {
    let program = load_or_exit(path, config);
    println!("{}: {} instructions, OK", path, program.len());
}

fn list_program(path: &str, config: CpuConfig) {
    let program = load_or_exit(path, config);
    print!("{}", listing(&program));
}

fn print_registers<C: bytesim::Console>(cpu: &Cpu<C>) {
    for (i, value) in cpu.regs.values().iter().enumerate() {
        println!("R{}: {:08b} ({})", i, value, value);
    }
}

fn power_on(config: CpuConfig) {
    println!("Powering on the system...");
    println!("System Powered On");

    let mut cpu = Cpu::new(config);
    if let Err(e) = bios_prompt(&mut cpu) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Read commands until `exit` or end of input.
fn bios_prompt(cpu: &mut Cpu) -> io::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("BIOS> ");
        io::stdout().flush()?;

        let command = match lines.next() {
            Some(line) => line?,
            None => return Ok(()),
        };
        let command = command.trim();

        if command == "exit" {
            return Ok(());
        } else if command.starts_with("address") {
            show_address(&*cpu, command);
        } else if command == "memory_dump" {
            let size = cpu.mem.size();
            println!("Memory Dump:\n{}", cpu.mem.dump(0, size).join("\n"));
        } else if command == "registers" {
            print_registers(&*cpu);
        } else if command.ends_with(".asm") {
            run_from_shell(cpu, command);
        } else {
            match cpu.execute(command) {
                Ok(true) => {}
                Ok(false) => println!("Halted."),
                Err(e) => {
                    log::warn!("shell instruction failed: {}", e);
                    println!("Error: {}", e);
                }
            }
        }
    }
}

fn show_address(cpu: &Cpu, command: &str) {
    let parts: Vec<&str> = command.split_whitespace().collect();
    if parts.len() != 2 {
        println!("Please enter the address you'd like to gather!");
        return;
    }

    let result = usize::from_str_radix(parts[1], 16)
        .map_err(|e| format!("invalid address '{}': {}", parts[1], e))
        .and_then(|addr| cpu.mem.read(addr).map_err(|e| e.to_string()));
    match result {
        Ok(value) => println!("Value at address {}: {:08b}", parts[1], value),
        Err(e) => println!("Error: {}", e),
    }
}

fn run_from_shell(cpu: &mut Cpu, path: &str) {
    let program = match Program::load(path, cpu.max_nesting()) {
        Ok(program) => program,
        Err(ProgramError::NotFound(_)) => {
            println!("Error: File '{}' not found.", path);
            return;
        }
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    };

    println!("Running program: {}", path);
    if let Err(e) = program.run(cpu) {
        log::warn!("program {} aborted: {}", path, e);
        println!("Error: {}", e);
    }
}
