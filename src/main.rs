fn main() {
    if let Err(err) = omics_harmonize::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
