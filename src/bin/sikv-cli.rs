//! SiKV interactive client
//!
//! ```bash
//! sikv-cli 127.0.0.1 8007
//! >> SET foo bar
//! Ok
//! >> GET foo
//! bar
//! >> quit
//! ```

use clap::Parser;
use sikv::network::Client;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// SiKV InMemory Database Client
#[derive(Parser, Debug)]
#[command(name = "sikv-cli")]
#[command(version = sikv::VERSION)]
struct Cli {
    /// Server host
    host: String,

    /// Server port
    port: u16,
}

fn prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(b">> ")?;
    stdout.flush()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut client = Client::connect((cli.host.as_str(), cli.port)).await?;

    println!("SiKV InMemory Database Client");
    println!("Connected to {}:{}. Type 'quit' or 'exit' to leave.", cli.host, cli.port);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let reply = client.send(line).await?;
        println!("{}", reply);
    }

    Ok(())
}
