//! VBAN sender
//!
//! Captures audio from the default input device and streams it to a receiver
//! as VBAN frames, raw PCM16 or Opus.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vban_stream::{
    audio::CpalSource, codec::OpusEncoder, config::SenderConfig, constants::OPUS_CHUNK_SIZE,
    network::UdpChannel, session::SendSession,
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
        Some(path) => SenderConfig::load(path)?,
        None => SenderConfig::default(),
    };

    tracing::info!(
        "Starting VBAN sender: stream \"{}\" -> {} ({} Hz, {} ch, {})",
        config.stream_name,
        config.target,
        config.sample_rate,
        config.channels,
        if config.opus { "Opus" } else { "PCM16" }
    );

    let channel = UdpChannel::connect(config.target)?;
    let source = CpalSource::open(config.channels, config.sample_rate)?;

    let mut session = SendSession::new(
        channel,
        source,
        config.stream_name.clone(),
        config.sample_rate,
        config.channels,
    )?;
    session.set_verbose(config.verbose);

    if config.opus {
        let encoder = OpusEncoder::new(config.sample_rate, config.channels, OPUS_CHUNK_SIZE)?;
        session.enable_opus(encoder, config.effective_chunk_size());
    } else {
        session.set_chunk_size(config.chunk_size);
    }

    session.run()?;
    Ok(())
}
