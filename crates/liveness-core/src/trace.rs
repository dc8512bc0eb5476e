//! Recorded observation traces: one JSON [`FrameObservation`] per line.
//!
//! Blank lines and lines starting with `#` are skipped.

use crate::types::FrameObservation;
use std::io::BufRead;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub fn read_trace(reader: impl BufRead) -> Result<Vec<FrameObservation>, TraceError> {
    let mut observations = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let observation = serde_json::from_str(trimmed).map_err(|source| TraceError::Parse {
            line: i + 1,
            source,
        })?;
        observations.push(observation);
    }
    tracing::debug!(frames = observations.len(), "trace loaded");
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rectangle;

    const FRAME: &str = concat!(
        r#"{"bounding_box":{"min_x":100.0,"min_y":100.0,"width":200.0,"height":200.0},"#,
        r#""left_eye_open_probability":0.1,"right_eye_open_probability":0.2,"#,
        r#""head_yaw_angle_degrees":0.0,"smiling_probability":0.0,"face_count":1}"#,
    );

    #[test]
    fn test_read_trace_skips_comments_and_blanks() {
        let text = format!("# blink\n\n{FRAME}\n   \n{FRAME}\n");
        let frames = read_trace(text.as_bytes()).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].bounding_box, Rectangle::new(100.0, 100.0, 200.0, 200.0));
        assert_eq!(frames[1].left_eye_open_probability, 0.1);
    }

    #[test]
    fn test_read_trace_reports_line() {
        let text = format!("{FRAME}\n# ok\n{{\"face_count\": 1}}\n");
        match read_trace(text.as_bytes()) {
            Err(TraceError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_sample_traces_replay() {
        use crate::{LivenessConfig, LivenessSession};
        use std::sync::Arc;

        let config = Arc::new(LivenessConfig::default().resolve().unwrap());
        let full = include_str!("../../../contrib/traces/full_pass.jsonl");
        let interrupted = include_str!("../../../contrib/traces/interrupted.jsonl");

        for (text, verified_frame) in [(full, 12), (interrupted, 11)] {
            let mut fired = 0;
            let mut verified_at = None;
            {
                let mut session = LivenessSession::new(Arc::clone(&config), || {});
                for (i, obs) in read_trace(text.as_bytes()).unwrap().iter().enumerate() {
                    if session.observe(obs).verified_now {
                        fired += 1;
                        verified_at = Some(i);
                    }
                }
            }
            assert_eq!(fired, 1);
            assert_eq!(verified_at, Some(verified_frame));
        }
    }

    #[test]
    fn test_read_trace_empty() {
        assert!(read_trace("".as_bytes()).unwrap().is_empty());
    }
}
