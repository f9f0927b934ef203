// First-page text extraction via an external tool

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use catalog_recon::assets::TextExtractor;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shells out to `pdftotext -l 1` with a hard timeout. The tool is
/// treated as unreliable: any failure, including the binary being
/// absent, is an `Err` and the caller falls back to filename heuristics.
pub struct PdfTextExtractor {
    root: PathBuf,
    timeout: Duration,
}

impl PdfTextExtractor {
    /// `root` is the TDS tree root; candidate paths are relative to it.
    pub fn new(root: PathBuf, timeout: Duration) -> Self {
        Self { root, timeout }
    }
}

impl TextExtractor for PdfTextExtractor {
    fn first_page_text(&self, path: &str) -> Result<String, String> {
        let full = self.root.join(path);
        let mut command = Command::new("pdftotext");
        command.arg("-l").arg("1").arg("-q").arg(&full).arg("-");
        run_with_timeout(command, self.timeout)
    }
}

/// Run a command, polling for completion; kill it on timeout. Stdout is
/// read after exit, which is fine for page-sized output.
fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<String, String> {
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| format!("spawn failed: {e}"))?;

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let mut text = String::new();
                if let Some(mut stdout) = child.stdout.take() {
                    stdout
                        .read_to_string(&mut text)
                        .map_err(|e| format!("read failed: {e}"))?;
                }
                if status.success() {
                    return Ok(text);
                }
                return Err(format!("exited with {status}"));
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!("timed out after {}ms", timeout.as_millis()));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(format!("wait failed: {e}")),
        }
    }
}
