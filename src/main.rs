use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match posture_stream_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("posture-stream: {}", e);
            ExitCode::FAILURE
        }
    }
}
