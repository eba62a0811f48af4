//! Minimal text conversation over a live session.
//!
//! Usage: `VOXSTREAM_API_KEY=... cargo run --example live_text`

use voxstream_client::{LiveClient, SessionRequest};
use voxstream_core::OutputRecord;

#[tokio::main]
async fn main() -> voxstream_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let api_key = std::env::var("VOXSTREAM_API_KEY").map_err(|_| {
        voxstream_core::Error::Configuration("VOXSTREAM_API_KEY is not set".to_string())
    })?;

    let client = LiveClient::new(api_key);
    let session = client
        .start(SessionRequest::new("models/gemini-2.0-flash-live-001"))
        .await?;
    let mut output = session.output_stream();

    session
        .send_text("In one sentence: what is PCM audio?", true)
        .await
        .map_err(voxstream_core::Error::from)?;

    while let Some(record) = output.next().await {
        match record {
            OutputRecord::Delta(delta) => {
                if let Some(text) = delta.text {
                    print!("{text}");
                }
                if delta.finish_reason.is_some() {
                    println!();
                    break;
                }
            }
            OutputRecord::Terminal { finish_reason, .. } => {
                println!("[{finish_reason}]");
                break;
            }
            _ => {}
        }
    }

    session.close().await;
    Ok(())
}
