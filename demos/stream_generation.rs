//! Streams a generation and prints the cover letter as it arrives.
//!
//! Run with:
//! ```bash
//! export CAREER_COPILOT_API_BASE_URL="http://localhost:8080"
//! export CAREER_COPILOT_TOKEN="your-id-token"
//! RUST_LOG=career_copilot=debug cargo run --example stream_generation -- "Job description..."
//! ```

use std::io::Write;
use std::time::Duration;

use career_copilot::client::GenerationClient;
use career_copilot::model::DocumentField;
use career_copilot::options::{ClientOptions, SecretString};
use career_copilot::session::SessionOutcome;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let token = std::env::var("CAREER_COPILOT_TOKEN")
        .expect("CAREER_COPILOT_TOKEN environment variable must be set");
    let job_description = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Backend engineer building streaming services in Rust.".to_string());

    let options = ClientOptions::from_env().with_connect_timeout(Duration::from_secs(10));
    let client = GenerationClient::new(options)?;

    let mut session = client.start(job_description, SecretString::new(token));

    // Give up after two minutes; the core itself has no timeout.
    let cancel = session.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(120)).await;
        cancel.cancel();
    });

    println!("Streaming cover letter...\n");
    while let Some(update) = session.next_update().await {
        if update.field == DocumentField::CoverLetter {
            print!("{}", update.chunk);
            std::io::stdout().flush()?;
        }
    }

    match session.outcome().await {
        SessionOutcome::Completed(docs) => {
            println!("\n\n=== Resume Summary ===\n{}", docs.resume_text);
            println!("\n=== Document ===\n{}", docs.document_url);
        }
        SessionOutcome::Failed(e) => {
            eprintln!("\nGeneration failed: {}", e);
            return Err(e.into());
        }
        SessionOutcome::Cancelled => println!("\nGeneration cancelled."),
    }

    Ok(())
}
