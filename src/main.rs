fn main() {
    if let Err(err) = fieldcam_lib::run() {
        eprintln!("fieldcam failed: {err:?}");
        std::process::exit(1);
    }
}
