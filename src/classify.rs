//! Decides whether retrieved content can be trusted before paragraph
//! emptiness is taken as a true negative.

use crate::content::RetrievedContent;
use crate::error::{BlockReason, ExtractionFailure};

/// Textual signatures of bot-protection interstitials. Cloudflare also injects
/// `/cdn-cgi/challenge-platform/scripts/jsd/` into ordinary pages, so only the
/// interstitial's own `/h/` script path counts.
pub const CHALLENGE_MARKERS: &[&str] = &[
    "cf-browser-verification",
    "cf_chl_opt",
    "/cdn-cgi/challenge-platform/h/",
    "<title>Just a moment...</title>",
    "Attention Required! | Cloudflare",
    "Checking your browser before accessing",
    "px-captcha",
    "_Incapsula_Resource",
    "captcha-delivery.com",
];

pub fn find_challenge_marker(raw: &str) -> Option<&'static str> {
    CHALLENGE_MARKERS.iter().copied().find(|marker| raw.contains(marker))
}

/// Pre-extraction checks, in order: HTTP status, provider flag, body markers.
pub fn check_blocked(content: &RetrievedContent) -> Result<(), ExtractionFailure> {
    let blocked = |reason| ExtractionFailure::Blocked {
        strategy: content.strategy,
        reason,
    };

    if let Some(status) = content.http_status {
        if !(200..300).contains(&status) {
            return Err(blocked(BlockReason::HttpStatus(status)));
        }
    }

    if content.challenge_detected {
        return Err(blocked(BlockReason::ProviderFlag));
    }

    if let Some(marker) = find_challenge_marker(&content.body.raw_text()) {
        return Err(blocked(BlockReason::ChallengeMarker(marker.to_string())));
    }

    Ok(())
}
