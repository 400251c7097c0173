use btcmi_api::run;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(outcome) => {
            let code = outcome.exit_code();
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(err) => {
            eprintln!("application error: {err}");
            std::process::exit(1);
        }
    }
}
