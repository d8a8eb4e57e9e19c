use std::process;

fn main() {
    match changes_markup_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("changes-markup error: {err:#}");
            process::exit(1);
        }
    }
}
