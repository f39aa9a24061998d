// Source platform classification from URL shape

/// Platform a URL belongs to, as far as acquisition cares.
///
/// Short-form platforms are always fetched as a single engine-merged
/// stream; each platform can carry its own cookie file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    YouTubeShorts,
    TikTok,
    Other,
}

impl Platform {
    pub fn classify(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.contains("youtube.com/shorts/") {
            Self::YouTubeShorts
        } else if lower.contains("tiktok.com") {
            Self::TikTok
        } else if lower.contains("youtube.com") || lower.contains("youtu.be") {
            Self::YouTube
        } else {
            Self::Other
        }
    }

    /// Short-form content skips format selection and quality ceilings.
    pub fn is_short_form(self) -> bool {
        matches!(self, Self::YouTubeShorts | Self::TikTok)
    }

    /// Stem of the per-platform cookie file, when credentials make sense.
    /// Shorts share the regular YouTube session.
    pub fn cookie_stem(self) -> Option<&'static str> {
        match self {
            Self::YouTube | Self::YouTubeShorts => Some("youtube"),
            Self::TikTok => Some("tiktok"),
            Self::Other => None,
        }
    }
}
