//! Minimal line client, used by `sikv-cli` and the end-to-end tests

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .context("Failed to connect to server")?;
        stream.set_nodelay(true)?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer,
        })
    }

    /// Send one command line and wait for its reply, newline stripped
    pub async fn send(&mut self, line: &str) -> Result<String> {
        let line = line.trim_end_matches(['\r', '\n']);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        let mut reply = Vec::new();
        let n = self.reader.read_until(b'\n', &mut reply).await?;
        if n == 0 {
            bail!("Connection closed by server");
        }
        if reply.last() == Some(&b'\n') {
            reply.pop();
        }
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }
}
