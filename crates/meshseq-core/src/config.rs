//! Player configuration.
//!
//! `PlayerOptions` is the loosely specified form accepted from hosts and
//! JSON files. `PlayerOptions::validate` resolves every default once and
//! produces an immutable `PlayerConfig`, rejecting unknown keys and
//! contradictory combinations.

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{MeshSeqError, Result};
use crate::time::{FrameIndex, FrameRate};

/// Widest zero-padding accepted for mesh file numbers.
pub const MAX_ZERO_PADDING: usize = 20;

/// Largest accepted start-frame offset.
pub const MAX_START_FRAME: u64 = u32::MAX as u64;

/// Largest accepted explicit sequence length.
pub const MAX_SEQUENCE_FRAMES: FrameIndex = u32::MAX as u64;

/// Largest accepted lookahead; anything longer than the unknown-length
/// sentinel can never be filled.
pub const MAX_FRAMES_TO_BUFFER: u64 = defaults::UNKNOWN_SEQUENCE_LENGTH;

/// Where a clip's video and mesh files live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClipLocator {
    /// Base path shared by the video (`{base}.mp4`) and the mesh directory (`{base}/`).
    BasePath(String),
    /// Explicit record overriding any subset of the naming convention.
    Explicit(ClipSpec),
}

impl ClipLocator {
    /// Resolve the locator against the default naming convention.
    pub fn resolve(&self) -> Result<ResolvedClip> {
        match self {
            Self::BasePath(base) => Ok(ResolvedClip {
                video_src: Some(format!("{}{}", base, defaults::VIDEO_EXTENSION)),
                naming: FrameNaming::with_directory(base.clone()),
            }),
            Self::Explicit(spec) => spec.resolve(),
        }
    }
}

impl From<&str> for ClipLocator {
    fn from(base: &str) -> Self {
        Self::BasePath(base.to_string())
    }
}

impl From<ClipSpec> for ClipLocator {
    fn from(spec: ClipSpec) -> Self {
        Self::Explicit(spec)
    }
}

/// Explicit clip description. Unset fields fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipSpec {
    /// Shorthand for `video_src = "{name}.mp4"` and `mesh_sequence_path = name`.
    pub name: Option<String>,
    pub video_src: Option<String>,
    pub mesh_sequence_path: Option<String>,
    pub file_prefix: Option<String>,
    pub file_suffix: Option<String>,
    pub zero_padding: Option<usize>,
    /// Added to a frame index to form its file number.
    pub start_frame: Option<u64>,
}

impl ClipSpec {
    fn resolve(&self) -> Result<ResolvedClip> {
        let (video_src, directory) = match &self.name {
            Some(name) => {
                if self.video_src.is_some() || self.mesh_sequence_path.is_some() {
                    return Err(MeshSeqError::InvalidConfig(format!(
                        "clip '{}' sets `name` together with `video_src`/`mesh_sequence_path`",
                        name
                    )));
                }
                (
                    Some(format!("{}{}", name, defaults::VIDEO_EXTENSION)),
                    name.clone(),
                )
            }
            None => (
                self.video_src.clone(),
                self.mesh_sequence_path.clone().unwrap_or_default(),
            ),
        };

        let zero_padding = self.zero_padding.unwrap_or(defaults::MESH_ZERO_PADDING);
        if zero_padding > MAX_ZERO_PADDING {
            return Err(MeshSeqError::InvalidConfig(format!(
                "zero padding {} exceeds the maximum of {}",
                zero_padding, MAX_ZERO_PADDING
            )));
        }

        let start_frame = self.start_frame.unwrap_or(defaults::MESH_START_FRAME);
        if start_frame > MAX_START_FRAME {
            return Err(MeshSeqError::InvalidConfig(format!(
                "start frame {} exceeds the maximum of {}",
                start_frame, MAX_START_FRAME
            )));
        }

        Ok(ResolvedClip {
            video_src,
            naming: FrameNaming {
                directory,
                prefix: self
                    .file_prefix
                    .clone()
                    .unwrap_or_else(|| defaults::MESH_FILE_PREFIX.to_string()),
                suffix: self
                    .file_suffix
                    .clone()
                    .unwrap_or_else(|| defaults::MESH_FILE_SUFFIX.to_string()),
                zero_padding,
                start_frame,
            },
        })
    }
}

/// Maps frame indices to mesh file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameNaming {
    pub directory: String,
    pub prefix: String,
    pub suffix: String,
    pub zero_padding: usize,
    pub start_frame: u64,
}

impl FrameNaming {
    /// Default naming rooted at `directory`.
    pub fn with_directory(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: defaults::MESH_FILE_PREFIX.to_string(),
            suffix: defaults::MESH_FILE_SUFFIX.to_string(),
            zero_padding: defaults::MESH_ZERO_PADDING,
            start_frame: defaults::MESH_START_FRAME,
        }
    }

    /// File name (without directory) for `frame`.
    pub fn file_name(&self, frame: FrameIndex) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            frame.saturating_add(self.start_frame),
            self.suffix,
            width = self.zero_padding
        )
    }

    /// Full locator for `frame`: `{directory}/{prefix}{number}{suffix}`.
    pub fn url_for(&self, frame: FrameIndex) -> String {
        format!("{}/{}", self.directory, self.file_name(frame))
    }
}

/// A clip locator with every default applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedClip {
    /// Video source handed to the clock; `None` keeps the clock's current source.
    pub video_src: Option<String>,
    pub naming: FrameNaming,
}

/// How the end of the mesh sequence is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceLength {
    /// Unknown up front; the first failed fetch narrows the bound.
    Discover,
    /// Announced length; fetch failures never change it.
    Fixed(FrameIndex),
}

impl SequenceLength {
    /// Bound in effect right after a clip load.
    pub fn initial_bound(self) -> FrameIndex {
        match self {
            Self::Discover => defaults::UNKNOWN_SEQUENCE_LENGTH,
            Self::Fixed(frames) => frames,
        }
    }

    /// True if fetch failures may narrow the bound.
    pub fn allows_discovery(self) -> bool {
        matches!(self, Self::Discover)
    }
}

/// Loosely specified player options, as accepted from hosts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerOptions {
    pub clip: Option<ClipLocator>,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub autoplay: bool,
    pub muted: bool,
    pub frames_to_buffer: Option<u64>,
    pub max_concurrent_requests: Option<usize>,
    pub max_frames: Option<FrameIndex>,
    pub discover_length: Option<bool>,
    pub frame_rate: Option<FrameRate>,
}

impl PlayerOptions {
    /// Parse options from JSON. Unknown keys are rejected.
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| MeshSeqError::Serialization(format!("Invalid player options: {}", e)))
    }

    /// Resolve defaults and check for contradictory settings.
    pub fn validate(&self) -> Result<PlayerConfig> {
        let length = match (self.max_frames, self.discover_length) {
            (Some(_), Some(true)) => {
                return Err(MeshSeqError::InvalidConfig(
                    "`max_frames` disables length discovery; drop one of `max_frames` or `discover_length`"
                        .to_string(),
                ))
            }
            (Some(0), _) => {
                return Err(MeshSeqError::InvalidConfig(
                    "`max_frames` must be at least 1".to_string(),
                ))
            }
            (Some(frames), _) if frames > MAX_SEQUENCE_FRAMES => {
                return Err(MeshSeqError::InvalidConfig(format!(
                    "`max_frames` {} exceeds the maximum of {}",
                    frames, MAX_SEQUENCE_FRAMES
                )))
            }
            (Some(frames), _) => SequenceLength::Fixed(frames),
            (None, Some(false)) => {
                return Err(MeshSeqError::InvalidConfig(
                    "length discovery disabled without an explicit `max_frames`".to_string(),
                ))
            }
            (None, _) => SequenceLength::Discover,
        };

        let frames_to_buffer = self.frames_to_buffer.unwrap_or(defaults::FRAMES_TO_BUFFER);
        if frames_to_buffer == 0 || frames_to_buffer > MAX_FRAMES_TO_BUFFER {
            return Err(MeshSeqError::InvalidConfig(format!(
                "`frames_to_buffer` must be between 1 and {}",
                MAX_FRAMES_TO_BUFFER
            )));
        }

        let max_concurrent_requests = self
            .max_concurrent_requests
            .unwrap_or(defaults::MAX_CONCURRENT_REQUESTS);
        if max_concurrent_requests == 0 {
            return Err(MeshSeqError::InvalidConfig(
                "`max_concurrent_requests` must be at least 1".to_string(),
            ));
        }

        let frame_rate = self.frame_rate.unwrap_or_default();
        if !frame_rate.is_valid() {
            return Err(MeshSeqError::InvalidConfig(format!(
                "frame rate {}/{} is not valid",
                frame_rate.numerator, frame_rate.denominator
            )));
        }

        let clip = self.clip.as_ref().map(ClipLocator::resolve).transpose()?;

        Ok(PlayerConfig {
            clip,
            looping: self.looping,
            autoplay: self.autoplay,
            // Autoplay is only permitted for muted media.
            muted: self.autoplay || self.muted,
            frames_to_buffer,
            max_concurrent_requests,
            length,
            frame_rate,
        })
    }
}

/// Fully resolved, immutable player configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Clip to load at construction, if any.
    pub clip: Option<ResolvedClip>,
    pub looping: bool,
    pub autoplay: bool,
    pub muted: bool,
    pub frames_to_buffer: u64,
    pub max_concurrent_requests: usize,
    pub length: SequenceLength,
    pub frame_rate: FrameRate,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            clip: None,
            looping: false,
            autoplay: false,
            muted: false,
            frames_to_buffer: defaults::FRAMES_TO_BUFFER,
            max_concurrent_requests: defaults::MAX_CONCURRENT_REQUESTS,
            length: SequenceLength::Discover,
            frame_rate: FrameRate::default(),
        }
    }
}
