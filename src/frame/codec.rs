use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FrameQueueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    H265,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioCodec {
    AacLc,
    Unknown,
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoCodec::H264 => write!(f, "h264"),
            VideoCodec::H265 => write!(f, "h265"),
            VideoCodec::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for VideoCodec {
    type Err = FrameQueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h264" | "avc" => Ok(VideoCodec::H264),
            "h265" | "hevc" => Ok(VideoCodec::H265),
            "unknown" => Ok(VideoCodec::Unknown),
            other => Err(FrameQueueError::Configuration(format!(
                "unsupported video codec '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioCodec::AacLc => write!(f, "aac-lc"),
            AudioCodec::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for AudioCodec {
    type Err = FrameQueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aac-lc" | "aac_lc" | "aac" => Ok(AudioCodec::AacLc),
            "unknown" => Ok(AudioCodec::Unknown),
            other => Err(FrameQueueError::Configuration(format!(
                "unsupported audio codec '{}'",
                other
            ))),
        }
    }
}
