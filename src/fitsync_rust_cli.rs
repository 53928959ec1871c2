use fitsync_cli::fitsync_cli_opts::FitsyncCliOpts;

#[tokio::main]
async fn main() {
    match FitsyncCliOpts::process_args().await {
        Ok(()) => (),
        Err(e) => {
            if !e.to_string().contains("Broken pipe") {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }
}
