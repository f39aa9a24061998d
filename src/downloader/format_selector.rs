// Format selection - pure decision logic over candidate streams
//
// Picks the best acceptable video and/or audio stream for a request.
// Remote metadata sometimes pairs a real resolution with a stub byte
// size; the plausibility table discards those instead of trusting the
// resolution alone.

use super::models::{CandidateStream, MediaKind, SelectionPlan};

const MB: u64 = 1024 * 1024;

/// Minimum plausible size per resolution floor, highest floor first.
const SIZE_FLOORS: [(u32, u64); 8] = [
    (2160, 20 * MB),
    (1440, 12 * MB),
    (1080, 8 * MB),
    (720, 5 * MB),
    (480, 3 * MB),
    (360, 2 * MB),
    (240, MB),
    (144, MB / 2),
];

/// Floor applied when the height is below every table entry.
const FALLBACK_MIN: u64 = 2 * MB;

/// Whether a reported (filesize, height) pair is believable.
/// Missing or zero inputs are rejected outright.
pub fn is_reasonable(filesize: Option<u64>, height: Option<u32>) -> bool {
    let (Some(filesize), Some(height)) = (filesize, height) else {
        return false;
    };
    if filesize == 0 || height == 0 {
        return false;
    }

    for (floor, min_bytes) in SIZE_FLOORS {
        if height >= floor {
            return filesize >= min_bytes;
        }
    }
    filesize >= FALLBACK_MIN
}

/// Pick the best acceptable streams for the requested kind.
///
/// An empty pick is not an error here; the executor decides whether an
/// absent selection is fatal for its branch.
pub fn select(
    candidates: &[CandidateStream],
    kind: MediaKind,
    quality_ceiling: u32,
) -> SelectionPlan {
    let mut plan = SelectionPlan::default();

    if matches!(kind, MediaKind::Video | MediaKind::Both) {
        plan.video = pick_video(candidates, quality_ceiling);
    }
    if matches!(kind, MediaKind::Audio | MediaKind::Both) {
        plan.audio = pick_audio(candidates);
    }

    plan
}

/// Highest plausible video stream at or under the ceiling.
fn pick_video(candidates: &[CandidateStream], quality_ceiling: u32) -> Option<CandidateStream> {
    candidates
        .iter()
        .filter(|c| c.has_video)
        .filter(|c| c.height.is_some_and(|h| h <= quality_ceiling))
        .filter(|c| is_reasonable(c.effective_size(), c.height))
        .max_by_key(|c| c.height.unwrap_or(0))
        .cloned()
}

/// Largest standalone audio stream (audio codec present, no video codec).
fn pick_audio(candidates: &[CandidateStream]) -> Option<CandidateStream> {
    candidates
        .iter()
        .filter(|c| c.has_audio && !c.has_video)
        .max_by_key(|c| c.effective_size().unwrap_or(0))
        .cloned()
}
