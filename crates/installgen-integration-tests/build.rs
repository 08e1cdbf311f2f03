fn main() {
    if let Err(e) = installgen::cargo::generate_loaders() {
        eprintln!("installer generation failed: {}", e);
        std::process::exit(1);
    }
}
