use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rodio::decoder::DecoderError;
use rodio::{Decoder, OutputStream, PlayError, Sink, StreamError};

#[derive(Debug)]
pub enum AudioError {
	Open {
		path: PathBuf,
		source: std::io::Error,
	},
	/// No default output device or it could not be opened
	Output(StreamError),
	Sink(PlayError),
	Decode {
		path: PathBuf,
		source: DecoderError,
	},
}

impl fmt::Display for AudioError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Open { path, source } => write!(f, "Failed to open music {}: {source}", path.display()),
			Self::Output(err) => write!(f, "Failed to open audio output: {err}"),
			Self::Sink(err) => write!(f, "Failed to create audio sink: {err}"),
			Self::Decode { path, source } => write!(f, "Failed to load music {}: {source}", path.display()),
		}
	}
}

impl std::error::Error for AudioError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Open { source, .. } => Some(source),
			Self::Output(err) => Some(err),
			Self::Sink(err) => Some(err),
			Self::Decode { source, .. } => Some(source),
		}
	}
}

/// Background music looping forever on the default output device
///
/// Playback runs on the audio backend's own thread. Dropping the player
/// stops the music and closes the device.
pub struct MusicPlayer {
	// Output stops when the stream is dropped
	_stream: OutputStream,
	sink: Sink,
	path: PathBuf,
}

impl MusicPlayer {
	/// Opens the output device and queues the track, paused
	pub fn load(path: &Path) -> Result<Self, AudioError> {
		let file = File::open(path).map_err(|source| AudioError::Open {
			path: path.to_owned(),
			source,
		})?;

		let (stream, handle) = OutputStream::try_default().map_err(AudioError::Output)?;
		let sink = Sink::try_new(&handle).map_err(AudioError::Sink)?;

		let source = Decoder::new_looped(BufReader::new(file)).map_err(|source| AudioError::Decode {
			path: path.to_owned(),
			source,
		})?;
		sink.pause();
		sink.append(source);

		log::info!("Loaded music {}", path.display());
		Ok(Self {
			_stream: stream,
			sink,
			path: path.to_owned(),
		})
	}

	pub fn play(&self) {
		log::debug!("Playing {}", self.path.display());
		self.sink.play();
	}

	pub fn pause(&self) {
		self.sink.pause();
	}

	pub fn is_paused(&self) -> bool {
		self.sink.is_paused()
	}

	/// 1.0 is the track's own volume
	pub fn set_volume(&self, volume: f32) {
		self.sink.set_volume(volume.max(0.));
	}
}

impl Drop for MusicPlayer {
	fn drop(&mut self) {
		self.sink.stop();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_track_fails_before_touching_the_device() {
		let err = MusicPlayer::load(Path::new("no/such/track.mp3")).err().unwrap();
		assert!(matches!(err, AudioError::Open { .. }));
		assert!(err.to_string().contains("no/such/track.mp3"));
	}
}
