//! Self-executing artifacts: a small C bootstrap with the compiled program
//! appended after a marker.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::diagnostics::CoilError;

/// NUL bytes preceding the tag in the payload marker.
pub const RESERVED_ZEROS: usize = 23;
pub const TAG: &[u8] = b"COILER_SRC:";
/// Key the bootstrap uses to unmask its copy of [`TAG`].
#[cfg(test)]
const TAG_KEY: u8 = 0x2a;

const BOOTSTRAP_SOURCE: &str = include_str!("../bootstrap/bootstrap.c");

/// The byte sequence separating the bootstrap from its payload.
pub fn payload_marker() -> Vec<u8> {
    let mut marker = vec![0u8; RESERVED_ZEROS];
    marker.extend_from_slice(TAG);
    marker
}

/// Build a native executable at `output` that runs `artifact` (a `.pyc`)
/// with `interpreter`.
pub fn create_executable(artifact: &Path, output: &Path, interpreter: &str) -> Result<(), CoilError> {
    let payload = fs::read(artifact).map_err(|e| {
        CoilError::io(format!("could not read compiled program '{}': {e}", artifact.display()), artifact)
    })?;

    let dir = tempfile::tempdir()
        .map_err(|e| CoilError::embed(format!("failed to create temporary directory: {e}")))?;
    let bootstrap_c = dir.path().join("bootstrap.c");
    fs::write(&bootstrap_c, BOOTSTRAP_SOURCE)
        .map_err(|e| CoilError::embed(format!("failed to write bootstrap source: {e}")))?;

    let output_status = std::process::Command::new("cc")
        .arg("-O2")
        .arg(format!("-DCOILER_INTERPRETER=\"{interpreter}\""))
        .arg(&bootstrap_c)
        .arg("-o")
        .arg(output)
        .output()
        .map_err(|e| CoilError::embed(format!("failed to invoke cc: {e}")))?;
    if !output_status.status.success() {
        return Err(CoilError::embed(format!(
            "bootstrap compilation failed:\n{}",
            String::from_utf8_lossy(&output_status.stderr)
        )));
    }

    append_payload(output, &payload)?;
    tracing::info!(output = %output.display(), bytes = payload.len(), "wrote executable");
    Ok(())
}

/// Append the marker and `payload` to the file at `binary`.
pub fn append_payload(binary: &Path, payload: &[u8]) -> Result<(), CoilError> {
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(binary)
        .map_err(|e| CoilError::io(format!("could not open '{}': {e}", binary.display()), binary))?;
    file.write_all(&payload_marker())
        .and_then(|_| file.write_all(payload))
        .map_err(|e| CoilError::io(format!("could not append payload: {e}"), binary))
}

/// The payload following the first marker in `data`, if any.
pub fn extract_payload(data: &[u8]) -> Option<&[u8]> {
    let marker = payload_marker();
    data.windows(marker.len())
        .position(|window| window == marker.as_slice())
        .map(|start| &data[start + marker.len()..])
}
