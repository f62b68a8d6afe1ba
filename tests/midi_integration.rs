//! Umbrella-level MIDI integration tests.
//!
//! Exercises the prelude and error conversion the way an application would,
//! with the in-memory backend standing in for a driver.
//!
//! Run with:
//! ```bash
//! cargo test -p midibridge --test midi_integration
//! ```

use midibridge::prelude::*;
use midibridge::{MemoryInput, MemoryOutput, PortSession};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

/// Wire an output into an input through the in-memory bus.
fn loopback_pair() -> Result<(MidiIn<MemoryInput>, MidiOut<MemoryOutput>)> {
    let backend = MemoryInput::new(["Bus"]);
    let driver = backend.driver();
    let config = InputConfig::default().ignore(IgnoreFilter::NONE);
    let mut input = MidiIn::with_backend(backend, config)?;
    input.open_port(0)?;

    let mut output = MidiOut::with_backend(
        MemoryOutput::new(["Bus"]).loopback(driver),
        OutputConfig::default(),
    )?;
    output.open_port(0)?;
    Ok((input, output))
}

#[test]
fn test_question_mark_converts_subsystem_errors() {
    fn open_missing() -> Result<()> {
        let backend = MemoryInput::new(["Only"]);
        let mut input = MidiIn::with_backend(backend, InputConfig::default())?;
        input.open_port(5)?;
        Ok(())
    }

    let err = open_missing().unwrap_err();
    assert_eq!(
        err,
        Error::Midi(midibridge::io::Error::OutOfRange { index: 5, count: 1 })
    );
    assert_eq!(err.to_string(), "MIDI: MIDI port 5 out of range (1 ports available)");
    assert!(!err.is_destroyed());
}

#[test]
fn test_destroyed_error_through_umbrella() {
    fn after_destroy() -> Result<usize> {
        let backend = MemoryInput::new(["Only"]);
        let mut input = MidiIn::with_backend(backend, InputConfig::default())?;
        input.destroy();
        Ok(input.port_count()?)
    }
    assert!(after_destroy().unwrap_err().is_destroyed());
}

#[test]
fn test_sysex_dump_split_by_driver() -> Result<()> {
    let backend = MemoryInput::new(["Synth"]);
    let driver = backend.driver();
    let config = InputConfig::default().ignore(IgnoreFilter::NONE);
    let mut input = MidiIn::with_backend(backend, config)?;
    input.open_port(0)?;

    let dumps = Arc::new(Mutex::new(Vec::new()));
    let d = Arc::clone(&dumps);
    input.on(EventKind::Sysex, move |event| {
        if let InputEvent::Sysex { bytes } = event {
            d.lock().push(bytes.clone());
        }
    })?;

    let feeder = thread::spawn(move || {
        driver.inject_now(&[0xF0, 0x43, 0x10, 0x4C]);
        driver.inject_now(&[0x00, 0x00, 0x7E, 0x00]);
        // Status byte mid-dump: the partial dump is abandoned
        driver.inject_now(&[0xF8]);
        driver.inject_now(&[0xF0, 0x43, 0x10]);
        driver.inject_now(&[0x4C, 0x00, 0xF7]);
    });
    feeder.join().expect("driver thread panicked");
    assert_eq!(input.dispatch_pending()?, 5);

    assert_eq!(
        *dumps.lock(),
        vec![vec![0xF0, 0x43, 0x10, 0x4C, 0x00, 0xF7]]
    );
    Ok(())
}

#[test]
fn test_note_stream_from_another_thread() -> Result<()> {
    let (mut input, output) = loopback_pair()?;

    let notes = Arc::new(Mutex::new(Vec::new()));
    let n = Arc::clone(&notes);
    input.on(EventKind::NoteOn, move |event| {
        if let InputEvent::NoteOn { note, channel, .. } = event {
            n.lock().push((*channel, *note));
        }
    })?;

    // The output lives on its own thread, like a sequencer would
    let sender = thread::spawn(move || -> Result<()> {
        let mut output = output;
        for note in 36..48u8 {
            output.send_message(&MidiOutputMessage::note_on(note % 16, note, 100))?;
        }
        Ok(())
    });
    sender.join().expect("sender thread panicked")?;
    input.dispatch_pending()?;

    let expected: Vec<(u8, u8)> = (36..48u8).map(|n| (n % 16, n)).collect();
    assert_eq!(*notes.lock(), expected);
    Ok(())
}

#[test]
fn test_session_round_trip() -> Result<()> {
    let (mut input, mut output) = loopback_pair()?;
    assert!(input.session()?.is_bound());

    output.close_port()?;
    assert!(output.send(&[0x90, 60, 1]).is_err());

    input.close_port()?;
    assert_eq!(*input.session()?, PortSession::Unbound);
    assert_eq!(input.dispatch_pending()?, 0);
    Ok(())
}
