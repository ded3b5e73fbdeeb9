fn main() {
    if let Err(e) = kibitz::run() {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}
