mod commands;
mod delegate;

use std::path::PathBuf;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let arg = std::env::args().nth(1);
    if arg.as_deref() == Some("--list-devices") {
        commands::list_devices();
        return;
    }

    let result = commands::load_configuration(arg.map(PathBuf::from).as_deref()).and_then(commands::run_pedal);
    if let Err(e) = result {
        log::error!("{}", e);
        process::exit(e.exit_code());
    }
}
