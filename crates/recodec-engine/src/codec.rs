//! Lossy codec adapters.
//!
//! A [`CodecAdapter`] performs one lossy round-trip: encode a [`Signal`] to a
//! lossy representation and decode it back to PCM. The loop treats it as an
//! opaque, retryable transformation.

use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use recodec_config::CodecConfig;
use recodec_io::{Signal, read_signal, write_signal};
use thiserror::Error;

/// Interval between child status polls while waiting on a codec process.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Bytes of stderr kept when a codec process fails.
const STDERR_TAIL_BYTES: u64 = 2048;

/// Errors raised by a codec round-trip.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The codec process did not finish in time and was killed.
    #[error("{program} {stage} timed out after {}s", .timeout.as_secs_f64())]
    Timeout {
        /// Executable name.
        program: String,
        /// "encode" or "decode".
        stage: &'static str,
        /// Limit that was exceeded.
        timeout: Duration,
    },

    /// The codec process exited unsuccessfully.
    #[error("{program} {stage} failed ({status}): {stderr}")]
    ExitStatus {
        /// Executable name.
        program: String,
        /// "encode" or "decode".
        stage: &'static str,
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Last part of the process's stderr.
        stderr: String,
    },

    /// Spawning the process or handling its files failed.
    #[error("codec I/O error during {stage}: {source}")]
    Io {
        /// Step that failed.
        stage: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the intermediate WAV failed.
    #[error("codec audio error during {stage}: {source}")]
    Audio {
        /// Step that failed.
        stage: &'static str,
        /// Underlying audio error.
        #[source]
        source: recodec_io::Error,
    },

    /// Decoded audio came back with a different sample rate or channel count.
    #[error(
        "decoded format {got_rate} Hz / {got_channels} ch does not match input {expected_rate} Hz / {expected_channels} ch"
    )]
    FormatMismatch {
        /// Input sample rate.
        expected_rate: u32,
        /// Input channel count.
        expected_channels: u16,
        /// Decoded sample rate.
        got_rate: u32,
        /// Decoded channel count.
        got_channels: u16,
    },
}

impl CodecError {
    /// Create an I/O error for a named step.
    pub fn io(stage: &'static str, source: std::io::Error) -> Self {
        CodecError::Io { stage, source }
    }

    fn audio(stage: &'static str, source: recodec_io::Error) -> Self {
        CodecError::Audio { stage, source }
    }
}

/// One lossy encode/decode round-trip.
///
/// The output keeps the input's sample rate and channel count; its length may
/// differ slightly because of codec framing. Implementations must be safe to
/// call again with the same input after a failure and must not leave
/// temporary files behind on any path.
pub trait CodecAdapter {
    /// Encode `input` and decode it back to PCM.
    fn encode_then_decode(&self, input: &Signal) -> Result<Signal, CodecError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<C: CodecAdapter + ?Sized> CodecAdapter for &C {
    fn encode_then_decode(&self, input: &Signal) -> Result<Signal, CodecError> {
        (**self).encode_then_decode(input)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<C: CodecAdapter + ?Sized> CodecAdapter for Box<C> {
    fn encode_then_decode(&self, input: &Signal) -> Result<Signal, CodecError> {
        (**self).encode_then_decode(input)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Round-trip through an external ffmpeg-compatible executable.
///
/// Each call runs the program twice inside a private scratch directory:
///
/// ```text
/// <program> -hide_banner -nostdin -y -i input.wav -c:a <encoder> -b:a <bitrate> [extra_args] encoded.<container>
/// <program> -hide_banner -nostdin -y -i encoded.<container> -c:a pcm_s16le -ar <rate> -ac <channels> decoded.wav
/// ```
///
/// The scratch directory is removed when the call returns, whatever the outcome.
#[derive(Debug, Clone)]
pub struct ExternalCodec {
    program: String,
    encoder: String,
    bitrate: String,
    container: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl ExternalCodec {
    /// Build an adapter from codec settings.
    pub fn from_config(config: &CodecConfig) -> Self {
        Self {
            program: config.program.clone(),
            encoder: config.encoder.clone(),
            bitrate: config.bitrate.clone(),
            container: config.container.clone(),
            extra_args: config.extra_args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Override the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-invocation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn encode_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(input.into());
        args.extend(
            ["-c:a", self.encoder.as_str(), "-b:a", self.bitrate.as_str()]
                .iter()
                .map(OsString::from),
        );
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push(output.into());
        args
    }

    fn decode_args(&self, input: &Path, output: &Path, rate: u32, channels: u16) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(input.into());
        args.extend(
            [
                "-c:a".to_string(),
                "pcm_s16le".to_string(),
                "-ar".to_string(),
                rate.to_string(),
                "-ac".to_string(),
                channels.to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.into());
        args
    }

    /// Run the program once, bounded by the timeout.
    fn invoke(&self, stage: &'static str, args: &[OsString], scratch: &Path) -> Result<(), CodecError> {
        let log_path = scratch.join(format!("{stage}.log"));
        let log = File::create(&log_path).map_err(|e| CodecError::io(stage, e))?;

        tracing::trace!(program = %self.program, stage, ?args, "spawning codec");
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log));
        // Own process group: a terminal Ctrl+C reaches only the driver, which
        // lets the running iteration finish.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);
        let mut child = command.spawn().map_err(|e| CodecError::io(stage, e))?;

        let Some(status) =
            wait_with_timeout(&mut child, self.timeout).map_err(|e| CodecError::io(stage, e))?
        else {
            return Err(CodecError::Timeout {
                program: self.program.clone(),
                stage,
                timeout: self.timeout,
            });
        };

        if !status.success() {
            return Err(CodecError::ExitStatus {
                program: self.program.clone(),
                stage,
                status,
                stderr: read_tail(&log_path),
            });
        }
        Ok(())
    }
}

impl CodecAdapter for ExternalCodec {
    fn encode_then_decode(&self, input: &Signal) -> Result<Signal, CodecError> {
        let scratch = tempfile::Builder::new()
            .prefix("recodec-")
            .tempdir()
            .map_err(|e| CodecError::io("scratch", e))?;

        let wav_in = scratch.path().join("input.wav");
        let encoded = scratch.path().join(format!("encoded.{}", self.container));
        let wav_out = scratch.path().join("decoded.wav");

        write_signal(&wav_in, input, 32).map_err(|e| CodecError::audio("write input", e))?;

        self.invoke("encode", &self.encode_args(&wav_in, &encoded), scratch.path())?;
        let decode_args = self.decode_args(&encoded, &wav_out, input.sample_rate(), input.channels());
        self.invoke("decode", &decode_args, scratch.path())?;

        let output = read_signal(&wav_out).map_err(|e| CodecError::audio("read output", e))?;
        if !output.same_format(input) {
            return Err(CodecError::FormatMismatch {
                expected_rate: input.sample_rate(),
                expected_channels: input.channels(),
                got_rate: output.sample_rate(),
                got_channels: output.channels(),
            });
        }
        Ok(output)
    }

    fn describe(&self) -> String {
        format!("{} {} @ {}", self.program, self.encoder, self.bitrate)
    }
}

/// Wait for `child`, killing it once `timeout` elapses.
///
/// Returns `None` if the child was killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            // The process may exit between the poll and the kill.
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Last few KiB of a log file, trimmed. Empty if unreadable.
fn read_tail(path: &Path) -> String {
    let Ok(mut file) = File::open(path) else {
        return String::new();
    };
    let len = file.metadata().map(|m| m.len()).unwrap_or(0);
    if len > STDERR_TAIL_BYTES && file.seek(SeekFrom::Start(len - STDERR_TAIL_BYTES)).is_err() {
        return String::new();
    }
    let mut buf = Vec::new();
    if file.read_to_end(&mut buf).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).trim().to_string()
}
