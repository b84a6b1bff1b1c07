use std::time::{Duration, Instant};

use log::{debug, warn};
use num_complex::Complex;

use crate::device::{CancelToken, Device, SessionGuard};
use crate::error::{EngineError, Result};

/// Default wall-clock budget for one acquisition.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default number of consecutive empty or flagged chunks tolerated.
pub const DEFAULT_MAX_STALLED_READS: u32 = 1_000;

/// Contiguous time-domain samples gathered in one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow(Vec<Complex<f32>>);

impl SampleWindow {
    pub fn new(samples: Vec<Complex<f32>>) -> Self {
        Self(samples)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn samples(&self) -> &[Complex<f32>] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Complex<f32>> {
        self.0
    }
}

/// Pulls chunks from a device until exactly `required_length` samples are
/// buffered.
#[derive(Debug, Clone)]
pub struct SampleStreamReader {
    required_length: usize,
    timeout: Duration,
    max_stalled_reads: u32,
}

impl SampleStreamReader {
    pub fn new(required_length: usize) -> Self {
        Self {
            required_length,
            timeout: DEFAULT_TIMEOUT,
            max_stalled_reads: DEFAULT_MAX_STALLED_READS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_stalled_reads(mut self, reads: u32) -> Self {
        self.max_stalled_reads = reads.max(1);
        self
    }

    pub fn required_length(&self) -> usize {
        self.required_length
    }

    /// Run one streaming session and return the filled window.
    ///
    /// Flagged chunks are logged and skipped. The session is stopped on
    /// every path out of this function.
    pub fn acquire(
        &self,
        device: &mut dyn Device,
        channel: usize,
        cancel: &CancelToken,
    ) -> Result<SampleWindow> {
        self.acquire_until(device, channel, || cancel.is_cancelled())
    }

    /// Like [`acquire`](Self::acquire), but gives up with
    /// [`EngineError::Cancelled`] as soon as `interrupt` returns true. It is
    /// polled before every receive.
    pub fn acquire_until(
        &self,
        device: &mut dyn Device,
        channel: usize,
        mut interrupt: impl FnMut() -> bool,
    ) -> Result<SampleWindow> {
        let mut guard = SessionGuard::start(device.open_stream(channel)?)?;

        let chunk_len = guard.session().max_chunk_len().max(1);
        let mut chunk = vec![Complex::new(0.0, 0.0); chunk_len];
        let mut samples = vec![Complex::new(0.0, 0.0); self.required_length];

        let started = Instant::now();
        // The timeout bounds a stall, not the whole acquisition.
        let mut last_progress = started;
        let mut filled = 0;
        let mut stalled = 0u32;

        while filled < self.required_length {
            if interrupt() {
                debug!("Acquisition interrupted after {filled} samples");
                guard.stop()?;
                return Err(EngineError::Cancelled);
            }

            let received = guard.session().receive_into(&mut chunk)?;
            let count = match received.error {
                Some(e) => {
                    warn!("Dropping chunk of {} samples: {e}", received.samples);
                    0
                }
                None => received.samples.min(chunk_len),
            };

            if count > 0 {
                stalled = 0;
                last_progress = Instant::now();
                let take = count.min(self.required_length - filled);
                samples[filled..filled + take].copy_from_slice(&chunk[..take]);
                filled += take;
                continue;
            }

            stalled += 1;
            if stalled >= self.max_stalled_reads || last_progress.elapsed() >= self.timeout {
                if let Err(e) = guard.stop() {
                    warn!("Failed to stop stream after timeout: {e}");
                }
                return Err(EngineError::AcquisitionTimeout {
                    received: filled,
                    required: self.required_length,
                    elapsed: started.elapsed(),
                });
            }
        }

        guard.stop()?;
        debug!("Acquired {filled} samples in {:?}", started.elapsed());
        Ok(SampleWindow::new(samples))
    }
}
