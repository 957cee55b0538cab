//! ExternalCodec against stand-in shell scripts.
//!
//! Everything runs in one test so no other test thread can fork while a
//! script file is still open for writing.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use recodec_config::CodecConfig;
use recodec_engine::{CodecAdapter, CodecError, ExternalCodec};
use recodec_io::Signal;
use tempfile::TempDir;

/// Copies the file after `-i` to the last argument.
const COPY_SCRIPT: &str = r#"#!/bin/sh
input=""
prev=""
for arg in "$@"; do
    if [ "$prev" = "-i" ]; then
        input="$arg"
    fi
    prev="$arg"
done
cp "$input" "$prev"
"#;

const FAIL_SCRIPT: &str = "#!/bin/sh\necho 'Unknown encoder' >&2\nexit 3\n";

const HANG_SCRIPT: &str = "#!/bin/sh\nsleep 10\n";

fn install(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn codec(program: &Path) -> ExternalCodec {
    let config = CodecConfig {
        program: program.to_string_lossy().into_owned(),
        container: "bin".to_string(),
        ..CodecConfig::default()
    };
    ExternalCodec::from_config(&config)
}

#[test]
fn external_codec_with_scripts() {
    let temp = TempDir::new().unwrap();
    let copy = install(temp.path(), "copy.sh", COPY_SCRIPT);
    let fail = install(temp.path(), "fail.sh", FAIL_SCRIPT);
    let hang = install(temp.path(), "hang.sh", HANG_SCRIPT);

    let input = Signal::new(
        (0..400).map(|i| (i as f32 * 0.01).sin() * 0.5).collect::<Vec<_>>(),
        22050,
        2,
    );

    // A pass-through "codec" returns the input at 32-bit precision.
    let output = codec(&copy).encode_then_decode(&input).unwrap();
    assert_eq!(output, input);

    // Nonzero exit carries stderr.
    match codec(&fail).encode_then_decode(&input) {
        Err(CodecError::ExitStatus { stage, stderr, status, .. }) => {
            assert_eq!(stage, "encode");
            assert_eq!(status.code(), Some(3));
            assert!(stderr.contains("Unknown encoder"), "{stderr}");
        }
        other => panic!("expected exit status error, got {other:?}"),
    }

    // A hung process is killed at the deadline.
    let started = std::time::Instant::now();
    let hung = codec(&hang).with_timeout(Duration::from_millis(200));
    match hung.encode_then_decode(&input) {
        Err(CodecError::Timeout { stage, .. }) => assert_eq!(stage, "encode"),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
}
