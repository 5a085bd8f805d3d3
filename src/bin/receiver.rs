//! VBAN receiver
//!
//! Listens for VBAN frames, matches the configured stream name, and renders
//! the audio to the default output device. The session itself never restarts;
//! this binary supervises it and rebuilds it after a fatal error.

use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vban_stream::{
    audio::CpalSink,
    codec::OpusDecoder,
    config::ReceiverConfig,
    network::UdpChannel,
    session::{ReceiveSession, StreamFormat},
};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional argument: path to a TOML config file.
    let config = match std::env::args().nth(1) {
        Some(path) => ReceiverConfig::load(path)?,
        None => ReceiverConfig::default(),
    };

    tracing::info!(
        "Starting VBAN receiver: stream \"{}\" on {}",
        config.stream_name,
        config.bind
    );

    loop {
        match run_session(&config) {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::error!("session failed: {}; restarting in 1s", e);
                std::thread::sleep(Duration::from_secs(1));
            }
        }
    }
}

fn run_session(config: &ReceiverConfig) -> vban_stream::Result<()> {
    let channel = UdpChannel::bind(config.bind)?;
    // Poll interval for stop requests; the protocol itself has no timeout.
    channel.set_read_timeout(Some(Duration::from_millis(500)))?;

    let sink = CpalSink::open(config.channels, config.sample_rate)?;

    let mut session = ReceiveSession::new(
        channel,
        sink,
        config.stream_name.clone(),
        StreamFormat::pcm(config.sample_rate, config.channels),
    );
    session.set_verbose(config.verbose);
    if config.opus {
        session.set_decoder(OpusDecoder::new(config.sample_rate, config.channels)?);
    }

    session.run()
}
