//! Tag-affinity scoring for wave selection.
//!
//! A track's score is the overlap between its tags and the session's
//! liked/skipped tag sets:
//!
//! ```text
//! score(track) = like_weight * |tags ∩ liked| - skip_weight * |tags ∩ skipped|
//! ```
//!
//! Tracks with a positive score are preferred: the pick is uniform among
//! the best `top_pool` of them. Without any positive score the pick is
//! uniform over every candidate. The random source is always passed in.

use crate::models::Track;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Reverse;

/// Weights and pool size used to score and pick tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringContext {
    pub like_weight: i32,
    pub skip_weight: i32,
    /// How many of the best positive-score tracks the pick is drawn from.
    pub top_pool: usize,
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self {
            like_weight: 2,
            skip_weight: 1,
            top_pool: 3,
        }
    }
}

/// Tag preferences of one session, as seen by the scorer.
#[derive(Debug, Clone, Copy)]
pub struct TagPreferences<'a> {
    pub liked: &'a [String],
    pub skipped: &'a [String],
}

/// Score one track. Each of its tags counts once per occurrence.
#[must_use]
pub fn tag_affinity(track: &Track, prefs: TagPreferences<'_>, context: &ScoringContext) -> i32 {
    track
        .tags
        .iter()
        .map(|tag| {
            let liked = if prefs.liked.contains(tag) { context.like_weight } else { 0 };
            let skipped = if prefs.skipped.contains(tag) { context.skip_weight } else { 0 };
            liked - skipped
        })
        .sum()
}

/// Score every track and order them best first. Ties keep catalog order.
#[must_use]
pub fn rank_tracks<'a>(
    tracks: &'a [Track],
    prefs: TagPreferences<'_>,
    context: &ScoringContext,
) -> Vec<(&'a Track, i32)> {
    let mut ranked: Vec<(&Track, i32)> = tracks
        .iter()
        .map(|track| (track, tag_affinity(track, prefs, context)))
        .collect();
    ranked.sort_by_key(|&(_, score)| Reverse(score));
    ranked
}

/// Pick one track from `candidates`.
///
/// With at least one positive score, draws uniformly among the first
/// `top_pool` positive-score tracks of the ranking; otherwise draws
/// uniformly among all candidates. `None` only for an empty slice.
pub fn choose_track<'a, R: Rng + ?Sized>(
    candidates: &'a [Track],
    prefs: TagPreferences<'_>,
    context: &ScoringContext,
    rng: &mut R,
) -> Option<&'a Track> {
    let ranked = rank_tracks(candidates, prefs, context);

    let top: Vec<&Track> = ranked
        .iter()
        .take_while(|&&(_, score)| score > 0)
        .take(context.top_pool)
        .map(|&(track, _)| track)
        .collect();

    match top.choose(rng) {
        Some(track) => Some(*track),
        None => choose_uniform(candidates, rng),
    }
}

/// Uniform pick, no scoring.
pub fn choose_uniform<'a, R: Rng + ?Sized>(candidates: &'a [Track], rng: &mut R) -> Option<&'a Track> {
    candidates.choose(rng)
}
