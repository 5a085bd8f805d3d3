//! Audio capture from the default input device
//!
//! The cpal stream lives in a dedicated thread (cpal streams are not `Send`);
//! the callback hands captured chunks to the session through a bounded
//! channel, which also paces the send loop to the device clock.

use bytes::{BufMut, Bytes, BytesMut};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::AudioSource;
use crate::error::AudioError;

/// Capture chunks buffered between the device callback and the session.
const CHANNEL_CAPACITY: usize = 64;

/// Capture source backed by the default cpal input device
pub struct CpalSource {
    channels: u16,
    running: Arc<AtomicBool>,
    chunk_rx: Receiver<Vec<i16>>,
    /// Samples received from the callback but not yet consumed by `read`.
    carry: VecDeque<i16>,
    thread_handle: Option<JoinHandle<()>>,
}

impl CpalSource {
    /// Open the default input device with the given format.
    pub fn open(channels: u16, sample_rate: u32) -> Result<Self, AudioError> {
        let device = crate::audio::default_input_device()?;

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
            .name("vban-capture".to_string())
            .spawn(move || {
                let running_in_callback = running_in_thread.clone();
                let stream = device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        if !running_in_callback.load(Ordering::Relaxed) {
                            return;
                        }
                        // Drop the chunk if the session falls behind.
                        let _ = chunk_tx.try_send(data.to_vec());
                    },
                    |err| {
                        tracing::error!("capture stream error: {}", err);
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
                        // Stream is dropped here, stopping capture.
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                channels,
                running,
                chunk_rx,
                carry: VecDeque::new(),
                thread_handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::StreamError(
                    "capture thread exited before the stream was ready".to_string(),
                ))
            }
        }
    }
}

impl AudioSource for CpalSource {
    fn read(&mut self, frames: usize) -> Result<Bytes, AudioError> {
        let wanted = frames * self.channels as usize;
        while self.carry.len() < wanted {
            let chunk = self
                .chunk_rx
                .recv()
                .map_err(|_| AudioError::SourceReadFailed("capture stream closed".to_string()))?;
            self.carry.extend(chunk);
        }

        let mut pcm = BytesMut::with_capacity(wanted * 2);
        for _ in 0..wanted {
            // Length checked above; the queue cannot be empty here.
            let sample = self.carry.pop_front().unwrap_or(0);
            pcm.put_i16_le(sample);
        }
        Ok(pcm.freeze())
    }

    fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.close();
    }
}
