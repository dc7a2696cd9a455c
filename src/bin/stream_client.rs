// Stream Client - prints frames from a running replay service
//
// ```console
// $ ./target/release/stream-client --host 127.0.0.1 --port 8765 --limit 20
// ```

use anyhow::{Context, Result};
use clap::Parser;
use sentinel_event_stream::service::StreamClient;

/// Command line arguments for the stream client
#[derive(Parser, Debug)]
#[command(name = "stream-client", version, about = "Print events from a replay stream")]
struct ClientArgs {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = 8765)]
    port: u16,

    /// Stop after this many frames (0 = until the server closes)
    #[arg(short, long, default_value_t = 0)]
    limit: usize,

    /// Print full JSON frames instead of a one-line summary
    #[arg(long)]
    raw: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = ClientArgs::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut client = StreamClient::connect(addr.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let banner = client.banner();
    println!(
        "Connected to {} ({} events per cycle from {}, speed x{}, loop={})",
        banner.service,
        banner.events,
        banner.datasets.join(", "),
        banner.speed_factor,
        banner.loop_enabled
    );

    let mut received = 0usize;
    while args.limit == 0 || received < args.limit {
        let Some(frame) = client.next_frame().await.context("failed to read frame")? else {
            break;
        };
        received += 1;

        if args.raw {
            println!("{}", serde_json::to_string(&frame)?);
        } else {
            println!("[{:>6}] {:<24} {} {}", frame.sequence, frame.dataset, frame.timestamp, frame.event);
        }
    }

    println!("Received {} frame(s)", received);
    Ok(())
}
