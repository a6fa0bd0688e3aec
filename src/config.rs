use std::{fmt, str::FromStr, time::Duration};

use crate::service::DEFAULT_PROMPT;

/// URL of the `/infer` route clients post to.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:12345/infer";
/// Address the server binds to.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 12345;
/// Pause between two capture cycles.
pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_secs(5);
/// Resolution frames are captured at.
pub const DEFAULT_IMAGE_RESOLUTION: ImageResolution = ImageResolution {
    width: 640,
    height: 480,
};

/// Width and height of captured frames, written as `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageResolution {
    pub width: usize,
    pub height: usize,
}

impl fmt::Display for ImageResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| format!("invalid dimension '{v}' in '{s}'"))
        };
        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

/// Converts a capture interval in seconds, rejecting negative, infinite or
/// oversized values.
pub fn capture_interval(secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid interval {secs}: {e}"))
}

/// Settings shared by the one-shot and the looping client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Full URL of the `/infer` route.
    pub service_url: String,
    pub default_prompt: String,
    /// Pause between two capture cycles.
    pub capture_interval: Duration,
    pub image_resolution: ImageResolution,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            default_prompt: DEFAULT_PROMPT.to_string(),
            capture_interval: DEFAULT_CAPTURE_INTERVAL,
            image_resolution: DEFAULT_IMAGE_RESOLUTION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resolution() {
        let res: ImageResolution = "1280x720".parse().unwrap();
        assert_eq!(res, ImageResolution { width: 1280, height: 720 });
        assert_eq!(res.to_string(), "1280x720");
    }

    #[test]
    fn capture_interval_rejects_unrepresentable_values() {
        assert_eq!(capture_interval(0.5), Ok(Duration::from_millis(500)));
        assert!(capture_interval(f64::INFINITY).is_err());
        assert!(capture_interval(f64::NAN).is_err());
        assert!(capture_interval(-1.0).is_err());
        assert!(capture_interval(1e30).is_err());
    }

    #[test]
    fn rejects_bad_resolution() {
        assert!("1280".parse::<ImageResolution>().is_err());
        assert!("0x720".parse::<ImageResolution>().is_err());
        assert!("axb".parse::<ImageResolution>().is_err());
    }
}
