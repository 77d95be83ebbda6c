//! Delta-debugging minimization of failure-inducing inputs.
//!
//! The shrink loop halves its granularity until a substring or a complement
//! still reproduces the original finding, then restarts on the smaller
//! input. Replays run through the caller, which owns the runner and routes
//! candidates that trigger a *different* finding into the normal failure
//! pipeline.

/// Outcome of replaying one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// The candidate reproduces the finding being minimized.
    Reproduced,
    /// The candidate runs clean or hits some other finding.
    NotReproduced,
    /// The campaign is stopping; abandon minimization.
    Abort,
}

/// Shrink `input` while preserving its classified failure.
///
/// Returns an input no longer than the original for which the caller
/// reported [`ReplayOutcome::Reproduced`] (or the original itself if no
/// smaller candidate reproduced). `steps` counts the replays performed.
pub fn minimize(
    input: &[u8],
    replay: &mut dyn FnMut(&[u8]) -> ReplayOutcome,
    steps: &mut usize,
) -> Vec<u8> {
    let mut current = input.to_vec();
    let mut divisor = 1usize;
    let mut prev_step = usize::MAX;

    loop {
        // Next strictly different granularity.
        let step = loop {
            divisor += 1;
            let step = current.len() / divisor;
            if step != prev_step {
                break step;
            }
        };
        prev_step = step;

        if step < 1 {
            return current;
        }

        let mut reproduced = None;

        // Substrings of length `step`.
        let mut i = 0;
        while i < current.len() {
            let candidate = current[i..(i + step).min(current.len())].to_vec();
            *steps += 1;
            match replay(&candidate) {
                ReplayOutcome::Reproduced => {
                    reproduced = Some(candidate);
                    break;
                }
                ReplayOutcome::NotReproduced => {}
                ReplayOutcome::Abort => return current,
            }
            i += step;
        }

        // Complements: everything but one `step`-sized window.
        if reproduced.is_none() {
            let mut i = 0;
            while i < current.len() {
                let mut candidate = current[..i].to_vec();
                if i + step < current.len() {
                    candidate.extend_from_slice(&current[i + step..]);
                }
                *steps += 1;
                match replay(&candidate) {
                    ReplayOutcome::Reproduced => {
                        reproduced = Some(candidate);
                        break;
                    }
                    ReplayOutcome::NotReproduced => {}
                    ReplayOutcome::Abort => return current,
                }
                i += step;
            }
        }

        if let Some(candidate) = reproduced {
            current = candidate;
            divisor = 1;
            prev_step = usize::MAX;
        }
        // Otherwise keep the input and retry at a finer granularity.
    }
}
