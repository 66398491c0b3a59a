use super::format::AudioFormat;
use super::level::{LevelCell, rms_db};
use super::service::{Recorder, RecordingService};
use super::sink::AudioSink;
use super::wav_sink::WavSink;
use crate::error::RecordError;
use crate::messages::{AudioEvent, EventSender};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use ringbuf::{HeapCons, HeapRb, traits::*};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Notify, oneshot};

/// Microphone recording through the default cpal input device
pub struct CpalRecording {
    events: EventSender,
}

impl CpalRecording {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl RecordingService for CpalRecording {
    fn open(&mut self, target: &Path, format: AudioFormat) -> Result<Box<dyn Recorder>, RecordError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(RecordError::NoDevice)?;

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let ring = HeapRb::<f32>::new(format.samples_for_duration(10.0).max(1));
        let (mut producer, consumer) = ring.split();

        let notify = Arc::new(Notify::new());
        let level = Arc::new(LevelCell::new());
        let counters = Arc::new(CaptureCounters::default());

        let notify_callback = notify.clone();
        let level_callback = level.clone();
        let counters_callback = counters.clone();
        let error_events = self.events.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    push_captured(&mut producer, data, &counters_callback);
                    level_callback.store(rms_db(data));
                    notify_callback.notify_one();
                },
                move |err| {
                    let _ = error_events.send(AudioEvent::EncodeError(err.to_string()));
                },
                None,
            )
            .map_err(|e| RecordError::Stream(e.to_string()))?;

        // Create the file only once the device accepted the format
        let sink = WavSink::create(target, format)?;

        tracing::debug!("Opened recorder for {:?} ({:?})", target, format);

        Ok(Box::new(CpalRecorder {
            format,
            stream: Some(stream),
            pending: Some(Pending {
                consumer,
                sink: Box::new(sink),
                notify,
                counters: counters.clone(),
            }),
            stop_tx: None,
            level,
            counters,
            recording: false,
            events: self.events.clone(),
        }))
    }
}

struct Pending {
    consumer: HeapCons<f32>,
    sink: Box<dyn AudioSink>,
    notify: Arc<Notify>,
    counters: Arc<CaptureCounters>,
}

/// Sample counts shared between the device callback and the recorder
#[derive(Debug, Default)]
struct CaptureCounters {
    captured: AtomicU64,
    dropped: AtomicU64,
}

impl CaptureCounters {
    fn captured(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Push one device buffer into the ring. Samples that do not fit are
/// counted as dropped.
fn push_captured(producer: &mut impl Producer<Item = f32>, data: &[f32], counters: &CaptureCounters) {
    let pushed = producer.push_slice(data);
    counters.captured.fetch_add(data.len() as u64, Ordering::Relaxed);
    let dropped = data.len() - pushed;
    if dropped > 0 {
        counters.dropped.fetch_add(dropped as u64, Ordering::Relaxed);
    }
}

pub struct CpalRecorder {
    format: AudioFormat,
    stream: Option<cpal::Stream>,
    pending: Option<Pending>,
    stop_tx: Option<oneshot::Sender<()>>,
    level: Arc<LevelCell>,
    counters: Arc<CaptureCounters>,
    recording: bool,
    events: EventSender,
}

impl Recorder for CpalRecorder {
    fn record(&mut self) -> Result<(), RecordError> {
        let (Some(stream), Some(pending)) = (self.stream.as_ref(), self.pending.take()) else {
            return Err(RecordError::Unavailable("recorder was already used"));
        };

        stream
            .play()
            .map_err(|e| RecordError::Stream(e.to_string()))?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let chunk_size = self.format.samples_for_duration(0.1).max(1);
        tokio::task::spawn_local(bridge_task(pending, chunk_size, stop_rx, self.events.clone()));

        self.stop_tx = Some(stop_tx);
        self.recording = true;
        tracing::info!("Audio capture started");
        Ok(())
    }

    fn stop(&mut self) {
        if !self.recording {
            return;
        }
        self.recording = false;

        // Dropping the stream stops the device callback
        self.stream = None;

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        tracing::info!("Audio capture stopped");
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn current_time(&self) -> f64 {
        self.format.duration_of(self.counters.captured())
    }

    fn current_level(&self, _channel: usize) -> f32 {
        self.level.load()
    }
}

/// Moves captured samples from the ring into the sink until stopped, then
/// drains the remainder, finalizes the file and reports completion.
async fn bridge_task(
    pending: Pending,
    chunk_size: usize,
    mut stop_rx: oneshot::Receiver<()>,
    events: EventSender,
) {
    let Pending {
        mut consumer,
        mut sink,
        notify,
        counters,
    } = pending;
    let mut healthy = true;

    loop {
        tokio::select! {
            _ = notify.notified() => {
                while healthy && consumer.occupied_len() >= chunk_size {
                    healthy = write_from(&mut consumer, sink.as_mut(), chunk_size);
                }
            }
            _ = &mut stop_rx => break,
        }
    }

    while healthy && consumer.occupied_len() > 0 {
        let available = consumer.occupied_len();
        healthy = write_from(&mut consumer, sink.as_mut(), available);
    }

    let success = match sink.finalize().await {
        Ok(()) => healthy,
        Err(e) => {
            tracing::error!("Failed to finalize {:?}: {}", sink.path(), e);
            false
        }
    };

    let dropped = counters.dropped();
    if dropped > 0 {
        tracing::warn!(
            "Capture buffer overflowed, {} of {} samples were not written to {:?}",
            dropped,
            counters.captured(),
            sink.path()
        );
    }

    tracing::info!("Recording saved to {:?} (success: {})", sink.path(), success);
    let _ = events.send(AudioEvent::RecordingFinished { success });
}

fn write_from(consumer: &mut impl Consumer<Item = f32>, sink: &mut dyn AudioSink, len: usize) -> bool {
    let mut chunk = vec![0.0f32; len];
    let n = consumer.pop_slice(&mut chunk);
    chunk.truncate(n);

    match sink.write_chunk(chunk) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Failed to write audio chunk: {}", e);
            false
        }
    }
}
