use std::{env, fs, io, process};

use pyrite::Engine;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("usage: pyrite <script>...");
        process::exit(2);
    }

    let stdout = io::stdout();
    for arg in &args {
        let source = match fs::read_to_string(arg) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("{}: {}", arg, err);
                process::exit(1);
            }
        };
        if let Err(err) = Engine::default().execute(&source, &mut stdout.lock()) {
            eprintln!("{}: {}", arg, err);
            process::exit(1);
        }
    }
}
