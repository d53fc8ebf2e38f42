//! Landmark extractor seam and the helper-process implementation.
//!
//! Hand landmark detection runs in a separate helper process. For each frame
//! the monitor writes one JSON header line followed by the raw BGR bytes:
//!
//! ```text
//! {"width":640,"height":480,"channels":3}\n<width*height*3 bytes>
//! ```
//!
//! and reads back one line holding a JSON array of numbers, where `null`
//! marks a coordinate the detector could not report:
//!
//! ```text
//! [0.51,0.62,null,0.49,...]
//! ```

use super::types::FeatureVector;
use crate::device::Frame;
use crate::error::ExtractorError;
use serde::Serialize;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Turns a frame into a flat landmark vector (0, 21 or 42 values normally).
pub trait LandmarkExtractor: Send {
    fn extract(&mut self, frame: &Frame) -> Result<FeatureVector, ExtractorError>;
}

#[derive(Serialize)]
struct FrameHeader {
    width: u32,
    height: u32,
    channels: u32,
}

/// Extractor backed by a long-lived helper process.
pub struct ProcessExtractor {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcessExtractor {
    /// Spawns the helper. `command[0]` is the program, the rest its arguments.
    pub fn spawn(command: &[String]) -> Result<Self, ExtractorError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ExtractorError::Unavailable("no extractor command configured".into()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ExtractorError::Unavailable(format!("failed to start {program}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExtractorError::Unavailable("helper stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractorError::Unavailable("helper stdout not captured".into()))?;

        tracing::info!(program = %program, pid = child.id(), "Landmark extractor started");

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }
}

impl LandmarkExtractor for ProcessExtractor {
    fn extract(&mut self, frame: &Frame) -> Result<FeatureVector, ExtractorError> {
        let header = FrameHeader {
            width: frame.width(),
            height: frame.height(),
            channels: frame.channels(),
        };
        let header =
            serde_json::to_string(&header).map_err(|e| ExtractorError::Malformed(e.to_string()))?;

        writeln!(self.stdin, "{header}")?;
        self.stdin.write_all(frame.data())?;
        self.stdin.flush()?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(ExtractorError::Unavailable(
                "extractor closed its output".into(),
            ));
        }
        parse_landmark_line(&line)
    }
}

impl Drop for ProcessExtractor {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Parses one reply line from the helper.
pub fn parse_landmark_line(line: &str) -> Result<FeatureVector, ExtractorError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ExtractorError::Malformed("empty reply".into()));
    }
    serde_json::from_str(line).map_err(|e| ExtractorError::Malformed(e.to_string()))
}
