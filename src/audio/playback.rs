//! Audio playback to the default output device
//!
//! Mirrors the capture side: the cpal stream runs in its own thread and pulls
//! samples from a bounded channel. `write` blocks when the channel is full,
//! which paces the receive loop to the device clock.
//!
//! Reconfiguration opens the new stream before releasing the old one, so a
//! failed reopen leaves the previous configuration playing.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Sender};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::AudioSink;
use crate::error::AudioError;

/// Playback chunks buffered between the session and the device callback.
const CHANNEL_CAPACITY: usize = 64;

/// One open output stream with its feeding channel.
struct SinkWorker {
    running: Arc<AtomicBool>,
    chunk_tx: Sender<Vec<i16>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SinkWorker {
    fn spawn(channels: u16, sample_rate: u32) -> Result<Self, AudioError> {
        let device = crate::audio::default_output_device()?;

        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let running = Arc::new(AtomicBool::new(true));
        let (chunk_tx, chunk_rx) = bounded::<Vec<i16>>(CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);

        let running_in_thread = running.clone();
        let handle = thread::Builder::new()
            .name("vban-playback".to_string())
            .spawn(move || {
                let mut pending: VecDeque<i16> = VecDeque::new();
                let stream = device.build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        for slot in data.iter_mut() {
                            if pending.is_empty() {
                                if let Ok(chunk) = chunk_rx.try_recv() {
                                    pending.extend(chunk);
                                }
                            }
                            // Zero-fill on underrun.
                            *slot = pending.pop_front().unwrap_or(0);
                        }
                    },
                    |err| {
                        tracing::error!("playback stream error: {}", err);
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                            return;
                        }
                        let _ = ready_tx.send(Ok(()));
                        while running_in_thread.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                running,
                chunk_tx,
                thread_handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::StreamError(
                    "playback thread exited before the stream was ready".to_string(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SinkWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Playback sink backed by the default cpal output device
pub struct CpalSink {
    worker: Option<SinkWorker>,
}

impl CpalSink {
    /// Open the default output device with the given format.
    pub fn open(channels: u16, sample_rate: u32) -> Result<Self, AudioError> {
        Ok(Self {
            worker: Some(SinkWorker::spawn(channels, sample_rate)?),
        })
    }
}

impl AudioSink for CpalSink {
    fn reconfigure(&mut self, channels: u16, sample_rate: u32) -> Result<(), AudioError> {
        let new_worker = SinkWorker::spawn(channels, sample_rate)
            .map_err(|e| AudioError::SinkReconfigurationFailed(e.to_string()))?;
        if let Some(mut old) = self.worker.replace(new_worker) {
            old.stop();
        }
        Ok(())
    }

    fn write(&mut self, pcm: &[u8]) -> Result<(), AudioError> {
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| AudioError::SinkWriteFailed("sink is closed".to_string()))?;

        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        worker
            .chunk_tx
            .send(samples)
            .map_err(|_| AudioError::SinkWriteFailed("playback stream closed".to_string()))
    }

    fn close(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.close();
    }
}
