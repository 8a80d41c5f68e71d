//! Experiment phases and the phase timeline.
//!
//! A run observes the stream under two sequential network conditions: a
//! quiescent [`Phase::Baseline`] window, then a loaded [`Phase::Attack`]
//! window during which the competing bulk transfer runs. Exactly one phase
//! is active at any time and the only transition is Baseline -> Attack.
//!
//! The [`PhaseTimeline`] is the artifact consumed by downstream report
//! tooling to attribute measurement rows to phases: an ordered list of
//! `{phase, start_time, end_time}` spans covering the whole run with no
//! gaps (the end of one span equals the start of the next).

use serde::{Deserialize, Serialize};

/// Observation phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Quiescent window, no competing load
    Baseline,
    /// Window with the competing bulk transfer running
    Attack,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Baseline => write!(f, "baseline"),
            Phase::Attack => write!(f, "attack"),
        }
    }
}

/// One contiguous span of the phase timeline.
///
/// Times are wall-clock seconds since the Unix epoch. `end_time` is `None`
/// while the span is open (and stays `None` in a sealed timeline only if the
/// run aborted before the span could be closed with a known instant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpan {
    /// Which phase this span covers
    pub phase: Phase,
    /// Span start, epoch seconds
    pub start_time: f64,
    /// Span end, epoch seconds (`None` while open)
    pub end_time: Option<f64>,
}

/// Ordered, gapless list of phase spans for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseTimeline {
    /// Spans in activation order
    pub spans: Vec<PhaseSpan>,
}

impl PhaseTimeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new span at `start_time`, closing the current one at the same
    /// instant so the timeline stays gapless.
    pub fn open(&mut self, phase: Phase, start_time: f64) {
        self.close(start_time);
        self.spans.push(PhaseSpan {
            phase,
            start_time,
            end_time: None,
        });
    }

    /// Close the currently open span, if any.
    pub fn close(&mut self, end_time: f64) {
        if let Some(span) = self.spans.last_mut() {
            if span.end_time.is_none() {
                span.end_time = Some(end_time);
            }
        }
    }

    /// The currently active phase, if a span is open.
    pub fn active(&self) -> Option<Phase> {
        self.spans
            .last()
            .filter(|span| span.end_time.is_none())
            .map(|span| span.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_then_attack_is_gapless() {
        let mut timeline = PhaseTimeline::new();
        timeline.open(Phase::Baseline, 100.0);
        assert_eq!(timeline.active(), Some(Phase::Baseline));

        timeline.open(Phase::Attack, 115.0);
        assert_eq!(timeline.active(), Some(Phase::Attack));

        timeline.close(145.0);
        assert_eq!(timeline.active(), None);

        assert_eq!(timeline.spans.len(), 2);
        assert_eq!(timeline.spans[0].end_time, Some(115.0));
        assert_eq!(timeline.spans[1].start_time, 115.0);
        assert_eq!(timeline.spans[1].end_time, Some(145.0));
    }

    #[test]
    fn double_close_keeps_first_end_time() {
        let mut timeline = PhaseTimeline::new();
        timeline.open(Phase::Baseline, 0.0);
        timeline.close(10.0);
        timeline.close(20.0);
        assert_eq!(timeline.spans[0].end_time, Some(10.0));
    }

    #[test]
    fn phase_display_names() {
        assert_eq!(Phase::Baseline.to_string(), "baseline");
        assert_eq!(Phase::Attack.to_string(), "attack");
    }
}
