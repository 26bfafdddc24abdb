//! Convenience constructors that materialize a message from a DSP/source
//! output and enqueue it (C5). Every function here follows the same shape
//! the source this protocol was distilled from used for its send_*
//! functions: build the message, stamp the timestamps, write it, and on
//! failure dispose the message and fall back to an Internal status.

use crate::channel::Channel;
use crate::codec;
use crate::message::{Message, PsdHeader, PsdMessage, Status};
use crate::queue::MessageQueue;
use crate::source::{DetectorMode, DetectorOutput};
use crate::time::Timestamp;

/// Builds and enqueues a Status-shaped message via `ctor` (one of
/// `Message::SourceInit`, `Message::Eos`, `Message::ReadError`,
/// `Message::Internal`, `Message::SamplesLost`). Returns whether the write
/// succeeded.
pub fn send_status(
    queue: &MessageQueue,
    ctor: impl FnOnce(Status) -> Message,
    code: i32,
    message: impl Into<String>,
) -> bool {
    let msg = ctor(Status::new(code, Some(message.into())));
    match queue.write(msg) {
        Ok(()) => true,
        Err((err, msg)) => {
            tracing::error!(error = %err, "failed to write status message, dropping");
            codec::dispose(msg);
            false
        }
    }
}

/// Translates each channel by the source's current tuned frequency and
/// enqueues the resulting list. On failure to enqueue, falls back to an
/// Internal status carrying the failure reason, matching the façade's
/// never-leak-on-any-failure-path contract.
pub fn send_detector_channels(queue: &MessageQueue, source_fc: i64, mut channels: Vec<Channel>) -> bool {
    for ch in channels.iter_mut() {
        ch.translate(source_fc);
    }
    let msg = Message::Channel(channels);
    match queue.write(msg) {
        Ok(()) => true,
        Err((err, msg)) => {
            tracing::error!(error = %err, "cannot write channel message");
            codec::dispose(msg);
            send_status(
                queue,
                Message::Internal,
                -1,
                format!("cannot write message: {err}"),
            );
            false
        }
    }
}

/// Deep-copies the source's info snapshot into a `Message::SourceInfo` and
/// enqueues it.
pub fn send_source_info(queue: &MessageQueue, info: Vec<u8>) -> bool {
    let msg = Message::SourceInfo(info);
    match queue.write(msg) {
        Ok(()) => true,
        Err((err, msg)) => {
            tracing::error!(error = %err, "cannot write source-info message");
            codec::dispose(msg);
            send_status(
                queue,
                Message::Internal,
                -1,
                format!("cannot write message: {err}"),
            );
            false
        }
    }
}

/// Reduces a detector's FFT output to a real-valued PSD: the real part
/// directly in autocorrelation mode, otherwise the magnitude squared and
/// normalized by window size.
fn reduce_fft_to_psd(detector: &dyn DetectorOutput) -> Vec<f32> {
    let window_size = detector.window_size() as f32;
    detector
        .fft_bins()
        .iter()
        .map(|&(re, im)| match detector.mode() {
            DetectorMode::Autocorrelation => re,
            DetectorMode::PowerSpectrum => (re * re + im * im) / window_size,
        })
        .collect()
}

/// Builds a PSD frame from a detector's output, stamps it with the
/// analyzer's current tuned frequency and timestamps, and enqueues it.
/// `measured_samp_rate` is the source's actual (as opposed to nominal)
/// sample rate, reported separately because the two can drift apart on
/// real hardware.
pub fn send_psd(
    queue: &MessageQueue,
    detector: &dyn DetectorOutput,
    inspector_id: u64,
    fc: i64,
    measured_samp_rate: f32,
    timestamp: Timestamp,
    rt_time: Timestamp,
) -> bool {
    let psd_data = reduce_fft_to_psd(detector);
    let samp_rate = if detector.decimation() > 1 {
        detector.samp_rate() / detector.decimation() as f32
    } else {
        detector.samp_rate()
    };
    let header = PsdHeader {
        fc,
        inspector_id,
        timestamp,
        rt_time,
        looped: false,
        history_size: psd_data.len() as u64,
        samp_rate,
        measured_samp_rate,
        n0: detector.n0(),
    };
    let msg = Message::Psd(PsdMessage::new(header, psd_data));
    match queue.write(msg) {
        Ok(()) => true,
        Err((err, msg)) => {
            tracing::error!(error = %err, "cannot write psd message");
            codec::dispose(msg);
            send_status(
                queue,
                Message::Internal,
                -1,
                format!("cannot write message: {err}"),
            );
            false
        }
    }
}
