//! Frame Sampling
//!
//! Picks a bounded, evenly spaced set of screenshots from a run directory
//! for injection into model prompts.
//!
//! ```text
//! runs/
//!   session-1/  frame-0.png frame-1.png ...
//!   session-2/  frame-0.png ...        <- penultimate session is used
//!   session-3/  (possibly still being written)
//! ```

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::completion::ContentPart;
use crate::config::VisionConfig;

/// Token separator in session and frame names
const SYMBOL_SPLIT: char = '-';

/// Deterministic frame selection over a directory of sessions
pub struct FrameSampler;

impl FrameSampler {
    /// Select `count` frames and return them base64-encoded, oldest first
    pub fn select(base_dir: &Path, count: usize) -> Result<Vec<String>> {
        Self::select_paths(base_dir, count)?
            .iter()
            .map(|path| encode_file(path))
            .collect()
    }

    /// Same selection as [`select`](Self::select), returning file paths
    pub fn select_paths(base_dir: &Path, count: usize) -> Result<Vec<PathBuf>> {
        let Some(session) = Self::choose_session(base_dir)? else {
            debug!(dir = %base_dir.display(), "No sessions found");
            return Ok(vec![]);
        };

        let frames = Self::collect_frames(&session)?;
        if frames.is_empty() {
            warn!(dir = %session.display(), "No frames found in session");
            return Ok(vec![]);
        }

        Ok(sample_indices(frames.len(), count)
            .into_iter()
            .map(|i| frames[i].clone())
            .collect())
    }

    /// The only session if there is one, otherwise the second-to-last
    fn choose_session(base_dir: &Path) -> Result<Option<PathBuf>> {
        let entries = std::fs::read_dir(base_dir)
            .with_context(|| format!("Failed to read image directory {}", base_dir.display()))?;

        let mut sessions: Vec<(u64, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match trailing_number(&name) {
                Some(n) => sessions.push((n, entry.path())),
                None => debug!(name = %name, "Skipping session without numeric suffix"),
            }
        }

        sessions.sort_by_key(|(n, _)| *n);

        let chosen = match sessions.len() {
            0 => None,
            1 => sessions.pop(),
            len => sessions.into_iter().nth(len - 2),
        };
        Ok(chosen.map(|(_, path)| path))
    }

    /// Regular `.png` files with a numeric final token, sorted by that number
    fn collect_frames(session: &Path) -> Result<Vec<PathBuf>> {
        let mut frames: Vec<(u64, PathBuf)> = Vec::new();

        for entry in std::fs::read_dir(session)
            .with_context(|| format!("Failed to read session {}", session.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(stem) = name.strip_suffix(".png") else {
                continue;
            };
            if let Some(n) = trailing_number(stem) {
                frames.push((n, entry.path()));
            }
        }

        frames.sort_by_key(|(n, _)| *n);
        Ok(frames.into_iter().map(|(_, p)| p).collect())
    }
}

/// Final `-` token parsed as a non-negative integer
fn trailing_number(name: &str) -> Option<u64> {
    let token = name.rsplit(SYMBOL_SPLIT).next()?;
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Endpoint-inclusive, evenly spaced indices into `len` frames.
///
/// `count == 1` yields only the last frame. Otherwise `count` is clamped to
/// `len` and slot `i` maps to `floor(i * (len - 1) / (count - 1))`.
pub fn sample_indices(len: usize, count: usize) -> Vec<usize> {
    if len == 0 || count == 0 {
        return vec![];
    }
    if count == 1 || len == 1 {
        return vec![len - 1];
    }

    let count = count.min(len);
    let mut indices = Vec::with_capacity(count);
    indices.push(0);
    for i in 1..count - 1 {
        indices.push(i * (len - 1) / (count - 1));
    }
    indices.push(len - 1);
    indices
}

fn encode_file(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read frame {}", path.display()))?;
    Ok(BASE64.encode(bytes))
}

/// Frame injection for prompts, as configured for one agent run
#[derive(Debug, Clone, Default)]
pub struct VisionContext {
    enabled: bool,
    images_path: Option<PathBuf>,
    image_count: usize,
}

impl VisionContext {
    pub fn from_config(config: &VisionConfig) -> Self {
        Self {
            enabled: config.enabled,
            images_path: config.images_path.clone(),
            image_count: config.image_count,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Image parts for a prompt; failures mean "no visual context"
    pub fn image_parts(&self) -> Vec<ContentPart> {
        if !self.enabled {
            return vec![];
        }
        let Some(path) = &self.images_path else {
            warn!("Vision enabled without an images path, continuing without images");
            return vec![];
        };

        match FrameSampler::select(path, self.image_count) {
            Ok(images) => {
                if images.is_empty() {
                    warn!(dir = %path.display(), "No images available, continuing without images");
                }
                images.into_iter().map(ContentPart::Image).collect()
            }
            Err(e) => {
                warn!(dir = %path.display(), "Error loading images: {:#}", e);
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_indices() {
        assert_eq!(sample_indices(0, 3), Vec::<usize>::new());
        assert_eq!(sample_indices(5, 0), Vec::<usize>::new());
        assert_eq!(sample_indices(5, 1), vec![4]);
        assert_eq!(sample_indices(5, 2), vec![0, 4]);
        assert_eq!(sample_indices(5, 3), vec![0, 2, 4]);
        assert_eq!(sample_indices(10, 4), vec![0, 3, 6, 9]);
        assert_eq!(sample_indices(3, 10), vec![0, 1, 2]);
        assert_eq!(sample_indices(1, 3), vec![0]);
    }

    #[test]
    fn test_trailing_number() {
        assert_eq!(trailing_number("run-12"), Some(12));
        assert_eq!(trailing_number("7"), Some(7));
        assert_eq!(trailing_number("run-"), None);
        assert_eq!(trailing_number("run-1a"), None);
        assert_eq!(trailing_number("run--3"), Some(3));
    }

    #[test]
    fn test_disabled_context_yields_nothing() {
        assert!(VisionContext::disabled().image_parts().is_empty());
    }
}
