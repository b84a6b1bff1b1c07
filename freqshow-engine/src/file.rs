use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use freqshow_messages::{GainMode, Hertz};
use log::debug;
use num_complex::Complex;

use crate::device::{Device, DeviceConfig, Received, StreamSession, check_channel, check_positive};
use crate::error::DeviceError;

/// Samples read from disk per receive call.
pub const FILE_CHUNK_LEN: usize = 8192;

const BYTES_PER_SAMPLE: usize = 2 * std::mem::size_of::<f32>();

/// File-backed device that replays recorded IQ samples.
/// Expects interleaved I/Q samples as little-endian f32 pairs.
///
/// Tuning setters are accepted and reported back but do not change the
/// recording.
#[derive(Debug)]
pub struct FileDevice {
    file: File,
    loop_on_eof: bool,
    config: DeviceConfig,
}

impl FileDevice {
    /// Open a recording. If `loop_on_eof` is true, playback restarts from
    /// the beginning on EOF.
    pub fn open<P: AsRef<Path>>(
        path: P,
        loop_on_eof: bool,
        config: DeviceConfig,
    ) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            file,
            loop_on_eof,
            config,
        })
    }

    /// Read IQ samples into `buf`, returning how many were decoded.
    /// Zero means EOF with looping disabled.
    fn read_samples(&mut self, buf: &mut [Complex<f32>]) -> io::Result<usize> {
        let bytes_needed = buf.len() * BYTES_PER_SAMPLE;
        let mut byte_buf = vec![0u8; bytes_needed];

        let mut total_read = 0;

        loop {
            match self.file.read(&mut byte_buf[total_read..]) {
                Ok(0) => {
                    // An empty recording would rewind forever.
                    if self.loop_on_eof && total_read == 0 && self.file.metadata()?.len() > 0 {
                        self.file.seek(io::SeekFrom::Start(0))?;
                        continue;
                    }
                    break;
                }
                Ok(n) => {
                    total_read += n;
                    if total_read >= bytes_needed {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        let samples_read = total_read / BYTES_PER_SAMPLE;
        for (slot, bytes) in buf
            .iter_mut()
            .zip(byte_buf[..samples_read * BYTES_PER_SAMPLE].chunks_exact(BYTES_PER_SAMPLE))
        {
            let i_val = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            let q_val = f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
            *slot = Complex::new(i_val, q_val);
        }

        Ok(samples_read)
    }
}

impl Device for FileDevice {
    fn frequency(&self) -> Hertz {
        self.config.center_frequency
    }

    fn set_frequency(&mut self, frequency: Hertz) -> Result<(), DeviceError> {
        check_positive("frequency", frequency)?;
        self.config.center_frequency = frequency;
        Ok(())
    }

    fn sample_rate(&self) -> Hertz {
        self.config.sample_rate
    }

    fn set_sample_rate(&mut self, rate: Hertz) -> Result<(), DeviceError> {
        check_positive("sample rate", rate)?;
        self.config.sample_rate = rate;
        Ok(())
    }

    fn gain(&self) -> GainMode {
        self.config.gain
    }

    fn set_gain(&mut self, gain: GainMode) -> Result<(), DeviceError> {
        self.config.gain = gain;
        Ok(())
    }

    fn open_stream(&mut self, channel: usize) -> Result<Box<dyn StreamSession + '_>, DeviceError> {
        check_channel(channel, self.channel_count())?;
        Ok(Box::new(FileSession { device: self }))
    }
}

struct FileSession<'a> {
    device: &'a mut FileDevice,
}

impl StreamSession for FileSession<'_> {
    fn start(&mut self) -> Result<(), DeviceError> {
        debug!("Replaying IQ file (loop: {})", self.device.loop_on_eof);
        Ok(())
    }

    fn max_chunk_len(&self) -> usize {
        FILE_CHUNK_LEN
    }

    fn receive_into(&mut self, buf: &mut [Complex<f32>]) -> Result<Received, DeviceError> {
        let n = buf.len().min(FILE_CHUNK_LEN);
        match self.device.read_samples(&mut buf[..n])? {
            0 if n > 0 => Err(DeviceError::Stream("end of IQ file".to_string())),
            read => Ok(Received::samples(read)),
        }
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temp file with IQ samples
    fn create_iq_file(samples: &[f32]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        for &val in samples {
            temp_file.write_all(&val.to_le_bytes()).unwrap();
        }
        temp_file.flush().unwrap();
        temp_file
    }

    fn open(file: &NamedTempFile, loop_on_eof: bool) -> FileDevice {
        FileDevice::open(file.path(), loop_on_eof, DeviceConfig::default()).unwrap()
    }

    #[test]
    fn test_reads_interleaved_samples() {
        let temp_file = create_iq_file(&[
            1.0, 0.0,   // Sample 1: 1+0j
            0.0, 1.0,   // Sample 2: 0+1j
            -1.0, 0.0,  // Sample 3: -1+0j
            0.0, -1.0,  // Sample 4: 0-1j
        ]);

        let mut device = open(&temp_file, false);
        let mut buf = vec![Complex::new(0.0, 0.0); 4];

        let n = device.read_samples(&mut buf).unwrap();

        assert_eq!(n, 4);
        assert_eq!(buf, vec![
            Complex::new(1.0, 0.0),
            Complex::new(0.0, 1.0),
            Complex::new(-1.0, 0.0),
            Complex::new(0.0, -1.0),
        ]);
    }

    #[test]
    fn test_session_reports_eof_without_loop() {
        let temp_file = create_iq_file(&[1.0, 0.0, 0.0, 1.0]);

        let mut device = open(&temp_file, false);
        let mut session = device.open_stream(0).unwrap();
        session.start().unwrap();
        let mut buf = vec![Complex::new(0.0, 0.0); 2];

        assert_eq!(session.receive_into(&mut buf).unwrap(), Received::samples(2));
        assert!(matches!(
            session.receive_into(&mut buf),
            Err(DeviceError::Stream(_))
        ));
    }

    #[test]
    fn test_loops_on_eof() {
        let temp_file = create_iq_file(&[1.0, 2.0]);

        let mut device = open(&temp_file, true);
        let mut buf = vec![Complex::new(0.0, 0.0); 1];

        assert_eq!(device.read_samples(&mut buf).unwrap(), 1);
        assert_eq!(buf, vec![Complex::new(1.0, 2.0)]);

        // Second read should loop back to start
        assert_eq!(device.read_samples(&mut buf).unwrap(), 1);
        assert_eq!(buf, vec![Complex::new(1.0, 2.0)]);
    }

    #[test]
    fn test_empty_file_does_not_spin_when_looping() {
        let temp_file = create_iq_file(&[]);

        let mut device = open(&temp_file, true);
        let mut buf = vec![Complex::new(0.0, 0.0); 4];

        assert_eq!(device.read_samples(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_file_not_found() {
        let result =
            FileDevice::open("/nonexistent/path/to/file.iq", false, DeviceConfig::default());
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_partial_read_leaves_tail_untouched() {
        // Create file with 3 samples, but try to read 5
        let temp_file = create_iq_file(&[
            1.0, 0.0,   // Sample 1
            2.0, 0.0,   // Sample 2
            3.0, 0.0,   // Sample 3
        ]);

        let mut device = open(&temp_file, false);
        let mut buf = vec![Complex::new(0.0, 0.0); 5];

        let n = device.read_samples(&mut buf).unwrap();

        assert_eq!(n, 3);
        assert_eq!(buf[..3], [
            Complex::new(1.0, 0.0),
            Complex::new(2.0, 0.0),
            Complex::new(3.0, 0.0),
        ]);
        assert_eq!(buf[3], Complex::new(0.0, 0.0));
        assert_eq!(buf[4], Complex::new(0.0, 0.0));
    }
}
