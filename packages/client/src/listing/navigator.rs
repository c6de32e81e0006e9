/// Position inside a locally loaded sequence of cards.
///
/// Navigation wraps at both ends; on an empty sequence the index stays 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardNavigator {
    index: usize,
}

impl CardNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn next(&mut self, len: usize) -> usize {
        if len > 0 {
            self.index = (self.index + 1) % len;
        }
        self.index
    }

    pub fn previous(&mut self, len: usize) -> usize {
        if len > 0 {
            self.index = if self.index == 0 {
                len - 1
            } else {
                (self.index - 1).min(len - 1)
            };
        }
        self.index
    }

    /// Keeps the index on a valid element after the sequence shrank.
    pub fn clamp(&mut self, len: usize) -> usize {
        if self.index >= len {
            self.index = len.saturating_sub(1);
        }
        self.index
    }

    /// True when the index is within `threshold` cards of the end
    /// (`index >= len - threshold`).
    pub fn near_end(&self, len: usize, threshold: usize) -> bool {
        self.index + threshold >= len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_both_ways() {
        let mut nav = CardNavigator::new();
        assert_eq!(nav.previous(3), 2);
        assert_eq!(nav.next(3), 0);
        assert_eq!(nav.next(3), 1);
    }

    #[test]
    fn empty_sequence_is_a_no_op() {
        let mut nav = CardNavigator::new();
        assert_eq!(nav.next(0), 0);
        assert_eq!(nav.previous(0), 0);
        assert_eq!(nav.clamp(0), 0);
    }

    #[test]
    fn clamp_moves_to_new_last_element() {
        let mut nav = CardNavigator::new();
        nav.previous(4);
        assert_eq!(nav.index(), 3);
        assert_eq!(nav.clamp(3), 2);
        assert_eq!(nav.clamp(10), 2);
    }

    #[test]
    fn near_end_threshold() {
        let mut nav = CardNavigator::new();
        assert!(!nav.near_end(20, 5));
        for _ in 0..15 {
            nav.next(20);
        }
        assert!(nav.near_end(20, 5));

        nav.reset();
        assert!(nav.near_end(3, 5));
    }
}
