fn main() {
    if let Err(err) = wiregrid::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
