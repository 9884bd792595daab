fn main() {
    // run() has already logged the error
    if kbtinfo_lib::run().is_err() {
        std::process::exit(1);
    }
}
