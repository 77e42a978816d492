//! Audible cues for timer transitions.
//!
//! Output objects are not `Send`, so playback lives on a dedicated thread fed
//! through a channel. Without the `sound` feature the thread only logs cues.

#[cfg(feature = "sound")]
pub mod chime;

use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc, Mutex,
};
use std::thread;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SoundEvent {
    Start,
    Pause,
    Stop,
}

/// Fire-and-forget sound output. Failures never reach the caller.
pub trait SoundNotifier: Send + Sync {
    fn play(&self, event: SoundEvent);
}

/// Used when sound is disabled in settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl SoundNotifier for SilentNotifier {
    fn play(&self, event: SoundEvent) {
        debug!("sound disabled, skipping {:?} cue", event);
    }
}

enum AudioCommand {
    Play(SoundEvent),
}

pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    volume: f32,
}

impl AudioEngineHandle {
    pub fn new(volume: f32) -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        let mut guard = self.tx.lock().map_err(|e| e.to_string())?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let volume = self.volume;

        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || audio_loop(rx, volume))
            .map_err(|e| e.to_string())?;

        *guard = Some(tx.clone());
        Ok(tx)
    }
}

impl SoundNotifier for AudioEngineHandle {
    fn play(&self, event: SoundEvent) {
        let sent = self
            .ensure_thread()
            .and_then(|tx| tx.send(AudioCommand::Play(event)).map_err(|e| e.to_string()));
        if let Err(err) = sent {
            error!("Failed to queue {:?} cue: {}", event, err);
        }
    }
}

#[cfg(feature = "sound")]
fn audio_loop(rx: Receiver<AudioCommand>, volume: f32) {
    use chime::Chime;
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    let mut output: Option<(OutputStream, OutputStreamHandle)> = None;

    while let Ok(cmd) = rx.recv() {
        match cmd {
            AudioCommand::Play(event) => {
                if output.is_none() {
                    match OutputStream::try_default() {
                        Ok(stream) => output = Some(stream),
                        Err(e) => {
                            error!("Failed to create audio output stream: {}", e);
                            continue;
                        }
                    }
                }
                let Some((_, handle)) = output.as_ref() else {
                    continue;
                };
                match Sink::try_new(handle) {
                    Ok(sink) => {
                        sink.append(Chime::for_event(event, volume));
                        sink.detach();
                    }
                    Err(e) => error!("Failed to create audio sink: {}", e),
                }
            }
        }
    }
}

#[cfg(not(feature = "sound"))]
fn audio_loop(rx: Receiver<AudioCommand>, volume: f32) {
    while let Ok(AudioCommand::Play(event)) = rx.recv() {
        debug!("{:?} cue at volume {:.2} (built without audio output)", event, volume);
    }
}
