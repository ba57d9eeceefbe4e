use std::env;

use matrix1000::message::{classify, MessageKind};
use matrix1000::patch::BankNumber;
use matrix1000::{message_count, read_file, split_messages, strip_framing, Patch};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("usage: m1kident file");
        std::process::exit(1);
    }

    let input_file = &args[1];
    if let Some(buffer) = read_file(input_file) {
        let count = message_count(&buffer);
        for (index, message) in split_messages(&buffer).iter().enumerate() {
            println!("Message {} of {}", index + 1, count);
            match strip_framing(message) {
                Ok(payload) => identify(payload),
                Err(e) => println!("{}", e),
            }
            println!();
        }
    }
}

fn identify(payload: &[u8]) {
    let kind = classify(payload);
    println!("{}, payload = {} bytes", kind, payload.len());

    let patch = match kind {
        MessageKind::EditBufferDump => Patch::from_edit_buffer(payload),
        MessageKind::SingleProgramDump { .. } => {
            // The bank is not part of the message.
            Patch::from_program_dump(payload, BankNumber::new(0).unwrap())
        }
        _ => return,
    };
    match patch {
        Ok(patch) => {
            println!("Name: {}", patch.name());
            println!("Fingerprint: {}", patch.fingerprint());
        }
        Err(e) => println!("Unable to decode patch: {}", e),
    }
}
