use crate::cli::FilterArgs;
use colored::Colorize;

const LOGO: &str = r#"
     _ _     _    __ _ _ _
  __| | |__ (_) _/ _(_) | |_ ___ _ __
 / _` | '_ \| || |_| | | __/ _ \ '__|
| (_| | |_) | ||  _| | | ||  __/ |
 \__,_|_.__/|_||_| |_|_|\__\___|_|
"#;

pub fn print_logo() {
    println!("{}", LOGO.cyan());
}

pub fn print_init(args: &FilterArgs) {
    println!("{}\n", "Initializing barcode filtering...".cyan());
    println!("{args}");
}

pub fn print_file_info(fname: &str, file_num: usize, num_files: usize) {
    println!(
        "{} {}/{}: {}",
        "Processing shard".cyan(),
        file_num,
        num_files,
        fname
    );
}
