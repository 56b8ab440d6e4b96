//! Bind to a running simulator and poll a few well-known properties.
//!
//! Start the simulator with the telnet property server enabled, e.g.
//! `fgfs --telnet=5401`, then:
//!
//! ```sh
//! cargo run --example monitor -- localhost 5401
//! ```

use anyhow::{Context, Result};
use fgprops::{ClientConfig, PropertyTreeClient, PropertyTreeDelegate, PropertyValue};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const POLLED_DOUBLES: &[&str] = &[
    "/position/altitude-ft",
    "/velocities/airspeed-kt",
    "/orientation/heading-deg",
];

struct Printer;

impl PropertyTreeDelegate for Printer {
    fn did_bind(&self, host: &str, port: u16) {
        println!("bound to {host}:{port}");
    }

    fn did_timeout(&self) {
        println!("bind timed out; is the telnet property server running?");
    }

    fn did_disconnect(&self) {
        println!("disconnected");
    }

    fn did_receive_value(&self, key: &str, value: PropertyValue) {
        println!("{key} = {value}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port = match args.next() {
        Some(p) => p.parse().context("port must be a number")?,
        None => fgprops::DEFAULT_PORT,
    };

    let printer = Arc::new(Printer);
    let client = PropertyTreeClient::new(ClientConfig::default());
    client.set_delegate(&printer);
    client.bind(&host, port).await?;

    // Wait out the bind attempt, then poll until interrupted.
    tokio::time::sleep(Duration::from_secs(1)).await;
    loop {
        if client.is_bound() {
            for key in POLLED_DOUBLES {
                client.request_double(key).await?;
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.unbind().await;
    Ok(())
}
