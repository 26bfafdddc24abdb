//! Trait boundaries toward the external collaborators this protocol hands
//! data to and receives data from. Neither trait is implemented in this
//! crate: DSP pipelines, SDR hardware/file drivers, and the YAML-configured
//! CLI that wires them together are all out of scope here.

/// The analyzer's tuned source. Only what the sender façade needs to
/// translate channel frequencies and stamp source info is exposed.
pub trait Source: Send {
    /// The frequency, in Hz, the front end is currently tuned to.
    fn tuned_frequency(&self) -> i64;

    /// An opaque snapshot of the source's own descriptive state, carried by
    /// value inside `Message::SourceInfo` without interpretation.
    fn info_snapshot(&self) -> Vec<u8>;
}

/// Which reduction a channel detector's FFT output should go through before
/// it becomes a PSD frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorMode {
    /// Take the real part of each FFT bin directly.
    Autocorrelation,
    /// Square the magnitude and normalize by window size.
    PowerSpectrum,
}

/// A channel detector's output for one analysis window. `fft_bins` holds
/// complex `(re, im)` pairs; the sender façade reduces these to real PSD
/// values according to `mode`.
pub trait DetectorOutput {
    fn mode(&self) -> DetectorMode;
    fn window_size(&self) -> usize;
    fn decimation(&self) -> u32;
    fn samp_rate(&self) -> f32;
    fn n0(&self) -> f32;
    fn fft_bins(&self) -> &[(f32, f32)];
}
