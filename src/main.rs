use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match medbook_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("medbook: {e}");
            ExitCode::FAILURE
        }
    }
}
