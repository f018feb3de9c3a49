use std::process;

#[tokio::main]
async fn main() {
    let code = datanex_cli::run().await;
    process::exit(code);
}
