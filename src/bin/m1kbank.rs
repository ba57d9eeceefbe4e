use std::env;
use std::time::Instant;

use matrix1000::patch::BankNumber;
use matrix1000::{read_file, split_messages, strip_framing, BankDumpAssembler};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("usage: m1kbank file [bank]");
        std::process::exit(1);
    }

    let bank = match args.get(2).map(|s| s.parse::<usize>()) {
        None => 0,
        Some(Ok(bank)) => bank,
        Some(Err(e)) => {
            eprintln!("Invalid bank number: {}", e);
            std::process::exit(1);
        }
    };
    let bank = match BankNumber::new(bank) {
        Ok(bank) => bank,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let input_file = &args[1];
    let Some(buffer) = read_file(input_file) else {
        std::process::exit(1);
    };

    let mut assembler = BankDumpAssembler::default();
    let now = Instant::now();
    assembler.start(bank, now);
    for message in split_messages(&buffer) {
        if let Ok(payload) = strip_framing(&message) {
            assembler.on_message(payload, now);
        }
    }

    let missing = assembler.missing_slots();
    match assembler.finish() {
        Ok(patches) => {
            println!("Bank {}", bank);
            for patch in patches {
                let number = patch.program_number().map(|n| n.to_string()).unwrap_or_default();
                let marker = if patch.is_default_name() { " (default name)" } else { "" };
                println!("{} {}{}", number, patch.name(), marker);
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            let slots: Vec<String> = missing.iter().map(|s| format!("{:02}", s)).collect();
            eprintln!("Missing slots: {}", slots.join(" "));
            std::process::exit(1);
        }
    }
}
