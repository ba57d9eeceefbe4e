use std::env;

use matrix1000::message::is_master_settings_dump;
use matrix1000::{read_file, split_messages, strip_framing, GlobalSettings, SettingValue};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("usage: m1ksettings file");
        std::process::exit(1);
    }

    let input_file = &args[1];
    let Some(buffer) = read_file(input_file) else {
        std::process::exit(1);
    };

    let dump = split_messages(&buffer)
        .into_iter()
        .find(|m| strip_framing(m).map_or(false, is_master_settings_dump));
    let Some(dump) = dump else {
        println!("No master parameter dump found.");
        std::process::exit(1);
    };

    let settings = match strip_framing(&dump).and_then(GlobalSettings::from_dump) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    for setting in settings.decode() {
        let value = match setting.value {
            Ok(value) => match value {
                SettingValue::Lookup { .. } => format!("{} ({})", value, value.as_int()),
                _ => value.to_string(),
            },
            Err(e) => format!("<{}>", e),
        };
        println!("{:16} {:28} {}", setting.definition.group, setting.definition.name, value);
    }
}
