fn main() {
    if let Err(err) = equipment_history::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
