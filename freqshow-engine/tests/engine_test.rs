use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use freqshow_engine::testing::ScriptedDevice;
use freqshow_engine::{Engine, ModelConfig, SpectrumModel};
use freqshow_messages::{Command, Event, GainMode, Hertz, IntensityBound, SourceConfig};

// Test helpers to reduce boilerplate

fn tone_model() -> SpectrumModel {
    let config = ModelConfig {
        display_width: 64,
        ..ModelConfig::default()
    };
    SpectrumModel::open(&SourceConfig::default(), config).unwrap()
}

fn setup_engine(
    model: SpectrumModel,
) -> (
    flume::Sender<Command>,
    flume::Receiver<Event>,
    JoinHandle<anyhow::Result<()>>,
) {
    let (cmd_tx, cmd_rx) = flume::unbounded::<Command>();
    let (event_tx, event_rx) = flume::bounded::<Event>(16);

    let handle = thread::spawn(move || {
        let engine = Engine::new(cmd_rx, event_tx, model);
        engine.run()
    });

    (cmd_tx, event_rx, handle)
}

fn teardown_engine(
    cmd_tx: flume::Sender<Command>,
    event_rx: flume::Receiver<Event>,
    handle: JoinHandle<anyhow::Result<()>>,
) {
    cmd_tx.send(Command::Stop).unwrap();
    // Unblocks an engine waiting on a full event channel.
    drop(event_rx);
    let result = handle.join().expect("Engine thread should not panic");
    assert!(result.is_ok());
}

fn skip_state_snapshot(event_rx: &flume::Receiver<Event>) {
    match event_rx.recv_timeout(Duration::from_secs(2)) {
        Ok(Event::StateSnapshot(_)) => {}
        other => panic!("Should receive StateSnapshot, got {:?}", other),
    }
}

/// Wait for the next event matching `pred`, skipping spectra.
fn wait_for(event_rx: &flume::Receiver<Event>, pred: impl Fn(&Event) -> bool) -> Event {
    for _ in 0..1000 {
        let event = event_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("Engine went quiet");
        if pred(&event) {
            return event;
        }
    }
    panic!("Expected event never arrived");
}

#[test]
fn test_engine_sends_state_snapshot() {
    let (cmd_tx, event_rx, handle) = setup_engine(tone_model());

    let first_event = event_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("Should receive StateSnapshot");

    match first_event {
        Event::StateSnapshot(state) => {
            assert_eq!(state.sample_rate, Hertz::mhz(1.0));
            assert_eq!(state.center_frequency, Hertz::mhz(100.0));
            assert_eq!(state.gain, GainMode::Fixed(10.0));
            assert_eq!(state.display_width, 64);
            assert_eq!(state.window_length, 66);
        }
        _ => panic!("First event should be StateSnapshot, got {:?}", first_event),
    }

    teardown_engine(cmd_tx, event_rx, handle);
}

#[test]
fn test_engine_sends_spectrum_data() {
    let (cmd_tx, event_rx, handle) = setup_engine(tone_model());
    skip_state_snapshot(&event_rx);

    let mut spectrum_count = 0;
    for _ in 0..5 {
        match event_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(Event::SpectrumData { bins, range }) => {
                assert_eq!(bins.len(), 64, "Spectrum should span the display");
                assert!(range.span.is_some());
                spectrum_count += 1;
            }
            Ok(other) => panic!("Expected SpectrumData, got {:?}", other),
            Err(e) => panic!("Failed to receive SpectrumData: {:?}", e),
        }
    }

    assert_eq!(spectrum_count, 5, "Should receive 5 SpectrumData events");
    teardown_engine(cmd_tx, event_rx, handle);
}

#[test]
fn test_engine_applies_commands() {
    let (cmd_tx, event_rx, handle) = setup_engine(tone_model());
    skip_state_snapshot(&event_rx);

    cmd_tx
        .send(Command::SetCenterFrequency(Hertz::mhz(433.0)))
        .unwrap();
    let event = wait_for(&event_rx, |e| matches!(e, Event::StateSnapshot(_)));
    let Event::StateSnapshot(state) = event else {
        unreachable!()
    };
    assert_eq!(state.center_frequency, Hertz::mhz(433.0));
    assert_eq!(state.range.resolved_max, None);

    cmd_tx
        .send(Command::SetMinIntensity(IntensityBound::Fixed(-80.0)))
        .unwrap();
    let event = wait_for(&event_rx, |e| matches!(e, Event::StateSnapshot(_)));
    let Event::StateSnapshot(state) = event else {
        unreachable!()
    };
    assert_eq!(state.range.min, IntensityBound::Fixed(-80.0));
    assert_eq!(state.range.resolved_min, Some(-80.0));

    teardown_engine(cmd_tx, event_rx, handle);
}

#[test]
fn test_engine_reports_rejected_command() {
    let (cmd_tx, event_rx, handle) = setup_engine(tone_model());
    skip_state_snapshot(&event_rx);

    cmd_tx.send(Command::SetSampleRate(Hertz(0.0))).unwrap();
    let event = wait_for(&event_rx, |e| matches!(e, Event::Error(_)));

    match event {
        Event::Error(msg) => assert!(msg.contains("sample rate"), "unexpected message: {msg}"),
        _ => unreachable!(),
    }
    teardown_engine(cmd_tx, event_rx, handle);
}

#[test]
fn test_engine_reports_timeout_and_keeps_running() {
    let model = SpectrumModel::new(
        Box::new(ScriptedDevice::silent(16)),
        ModelConfig {
            display_width: 16,
            max_stalled_reads: 3,
            ..ModelConfig::default()
        },
    )
    .unwrap();
    let (cmd_tx, event_rx, handle) = setup_engine(model);
    skip_state_snapshot(&event_rx);

    for _ in 0..2 {
        match event_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(Event::Error(msg)) => assert!(msg.contains("timed out"), "{msg}"),
            other => panic!("Expected timeout error, got {:?}", other),
        }
    }

    teardown_engine(cmd_tx, event_rx, handle);
}

#[test]
fn test_cancel_token_ends_engine() {
    let model = SpectrumModel::new(
        Box::new(ScriptedDevice::silent(16)),
        ModelConfig {
            display_width: 16,
            max_stalled_reads: u32::MAX,
            timeout: Duration::from_secs(60),
            ..ModelConfig::default()
        },
    )
    .unwrap();
    let cancel = model.cancel_token();
    let (_cmd_tx, event_rx, handle) = setup_engine(model);
    skip_state_snapshot(&event_rx);

    thread::sleep(Duration::from_millis(50));
    cancel.cancel();

    let result = handle.join().expect("Engine thread should not panic");
    assert!(result.is_ok());
}

#[test]
fn test_stop_interrupts_a_long_acquisition() {
    let model = SpectrumModel::new(
        Box::new(ScriptedDevice::silent(16)),
        ModelConfig {
            display_width: 16,
            max_stalled_reads: u32::MAX,
            timeout: Duration::from_secs(60),
            ..ModelConfig::default()
        },
    )
    .unwrap();
    let (cmd_tx, event_rx, handle) = setup_engine(model);
    skip_state_snapshot(&event_rx);

    thread::sleep(Duration::from_millis(50));
    let stopped_at = Instant::now();
    cmd_tx.send(Command::Stop).unwrap();

    let result = handle.join().expect("Engine thread should not panic");
    assert!(result.is_ok());
    assert!(stopped_at.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_engine_runs_without_panic() {
    let (cmd_tx, event_rx, handle) = setup_engine(tone_model());

    thread::sleep(Duration::from_millis(100));
    drop(event_rx);

    // The engine may already have exited on the closed event channel.
    let _ = cmd_tx.send(Command::Stop);
    let result = handle.join();
    assert!(result.is_ok(), "Engine thread should not panic");
}
