use std::io::{self, Write};

use flume::Receiver;
use freqshow_messages::{Event, IntensityRange};
use log::{info, warn};

/// Intensity ramp from the bottom to the top of the scale.
const SHADES: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Drawn for every column while the scale is unresolved or degenerate.
const FLAT: char = '_';

/// Render one spectrum as a row of `columns` characters. Each column shows
/// the strongest bin it covers.
pub fn render_line(bins: &[f32], range: &IntensityRange, columns: usize) -> String {
    if bins.is_empty() || columns == 0 {
        return String::new();
    }
    let columns = columns.min(bins.len());
    let top = (SHADES.len() - 1) as f32;

    (0..columns)
        .map(|col| {
            let start = col * bins.len() / columns;
            let end = ((col + 1) * bins.len() / columns).max(start + 1);
            let db = bins[start..end].iter().copied().fold(f32::NEG_INFINITY, f32::max);
            match range.normalize(db) {
                Some(level) => SHADES[((level * top).round() as usize).min(SHADES.len() - 1)],
                None => FLAT,
            }
        })
        .collect()
}

/// Print spectra to stdout until the engine hangs up or `frames` rows have
/// been drawn.
pub fn run(
    event_rx: &Receiver<Event>,
    columns: usize,
    frames: Option<usize>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut drawn = 0;

    for event in event_rx.iter() {
        match event {
            Event::StateSnapshot(state) => info!(
                "Tuned to {:.3} MHz at {:.3} MS/s, gain {}, {} samples per spectrum",
                state.center_frequency.as_mhz(),
                state.sample_rate.as_mhz(),
                state.gain,
                state.window_length
            ),
            Event::SpectrumData { bins, range } => {
                let scale = match (range.resolved_min, range.resolved_max) {
                    (Some(min), Some(max)) => format!("{min:>7.1} .. {max:>6.1} dB"),
                    _ => "   unresolved scale".to_string(),
                };
                writeln!(out, "{scale} |{}|", render_line(&bins, &range, columns))?;
                drawn += 1;
                if frames.is_some_and(|limit| drawn >= limit) {
                    break;
                }
            }
            Event::Error(message) => warn!("{message}"),
        }
    }

    out.flush()?;
    Ok(())
}
