fn main() {
    if let Err(e) = fpsynth::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
