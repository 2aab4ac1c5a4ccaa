use clipcap_media::MediaSource;
use clipcap_types::TimeRange;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardAction {
    Continue,
    /// Playback hit the range end; media was paused and rewound to start.
    LoopedBack,
}

/// Keeps playback of the primary media inside the selected range.
#[derive(Debug, Clone, Copy)]
pub struct RangeGuard {
    range: TimeRange,
}

impl RangeGuard {
    pub fn new(range: TimeRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn set_range(&mut self, range: TimeRange) {
        self.range = range;
    }

    /// Positions freshly attached media at the range start.
    pub fn initialize(&self, media: &mut dyn MediaSource) {
        if self.range.is_degenerate() {
            return;
        }
        media.seek(self.range.start);
    }

    pub fn on_position_update(&self, media: &mut dyn MediaSource) -> GuardAction {
        if self.range.is_degenerate() {
            return GuardAction::Continue;
        }
        let position = media.position();
        if position < self.range.end {
            return GuardAction::Continue;
        }
        media.pause();
        media.seek(self.range.start);
        debug!(
            position,
            start = self.range.start,
            end = self.range.end,
            "reached range end; rewound to start"
        );
        GuardAction::LoopedBack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, RecordingOpener};

    fn guard() -> RangeGuard {
        RangeGuard::new(TimeRange::new(10.0, 20.0).unwrap())
    }

    #[test]
    fn initialize_seeks_to_start() {
        let opener = RecordingOpener::new(60.0);
        let mut media = opener.open_primary(0.0);
        guard().initialize(media.as_mut());
        assert_eq!(media.position(), 10.0);
    }

    #[test]
    fn positions_inside_the_range_are_left_alone() {
        let opener = RecordingOpener::new(60.0);
        let mut media = opener.open_primary(0.0);
        media.play();
        media.seek(19.9);
        opener.log().clear();

        assert_eq!(guard().on_position_update(media.as_mut()), GuardAction::Continue);
        assert!(opener.log().calls().is_empty());
        assert!(!media.is_paused());
    }

    #[test]
    fn reaching_the_end_pauses_then_rewinds() {
        let opener = RecordingOpener::new(60.0);
        let mut media = opener.open_primary(0.0);
        media.play();
        media.seek(20.0);
        opener.log().clear();

        assert_eq!(
            guard().on_position_update(media.as_mut()),
            GuardAction::LoopedBack
        );
        assert_eq!(opener.log().calls(), vec![Call::Pause, Call::Seek(10.0)]);
        assert!(media.is_paused());
        assert_eq!(media.position(), 10.0);
    }

    #[test]
    fn overshoot_is_treated_like_the_end() {
        let opener = RecordingOpener::new(60.0);
        let mut media = opener.open_primary(0.0);
        media.seek(25.5);
        assert_eq!(
            guard().on_position_update(media.as_mut()),
            GuardAction::LoopedBack
        );
        assert_eq!(media.position(), 10.0);
    }

    #[test]
    fn repeated_updates_after_loop_are_idempotent() {
        let opener = RecordingOpener::new(60.0);
        let mut media = opener.open_primary(0.0);
        media.seek(20.0);
        let guard = guard();
        guard.on_position_update(media.as_mut());
        opener.log().clear();

        assert_eq!(guard.on_position_update(media.as_mut()), GuardAction::Continue);
        assert!(opener.log().calls().is_empty());
    }

    #[test]
    fn degenerate_range_never_acts() {
        let opener = RecordingOpener::new(60.0);
        let mut media = opener.open_primary(0.0);
        media.seek(30.0);
        opener.log().clear();
        let guard = RangeGuard::new(TimeRange {
            start: 12.0,
            end: 12.0,
        });
        guard.initialize(media.as_mut());
        assert_eq!(guard.on_position_update(media.as_mut()), GuardAction::Continue);
        assert!(opener.log().calls().is_empty());
    }
}
