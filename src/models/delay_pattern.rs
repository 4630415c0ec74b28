//! Codebook delay pattern.
//!
//! MusicGen predicts all codebooks in one step, with codebook `i` lagging
//! `i` steps behind codebook 0:
//! ```text
//!   0 1 2 3 4 5 6
//! 0 x x x x x x x
//! 1 P x x x x x x
//! 2 P P x x x x x
//! 3 P P P x x x x
//! ```
//! This type stores raw predictions and answers the two questions the decoder
//! loop asks: what to feed back next, and which aligned frame just completed.

/// Per-codebook token history for `N` codebooks.
#[derive(Debug, Clone)]
pub struct DelayPattern<const N: usize> {
    codebooks: [Vec<i64>; N],
}

impl<const N: usize> Default for DelayPattern<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DelayPattern<N> {
    pub fn new() -> Self {
        assert!(N > 0, "at least one codebook is required");
        Self {
            codebooks: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Records one step's prediction, one token per codebook.
    pub fn push(&mut self, tokens: [i64; N]) {
        for (codebook, token) in self.codebooks.iter_mut().zip(tokens) {
            codebook.push(token);
        }
    }

    /// Next decoder input: the latest token of each codebook, with codebooks
    /// still inside their delay replaced by `pad_token_id`.
    pub fn next_input(&self, pad_token_id: i64) -> [i64; N] {
        let steps = self.len();
        std::array::from_fn(|i| {
            if steps > i {
                self.codebooks[i][steps - 1]
            } else {
                pad_token_id
            }
        })
    }

    /// The most recent frame whose tokens are all outside the delay, read
    /// along the diagonal. None until `N` steps have been pushed.
    pub fn last_aligned(&self) -> Option<[i64; N]> {
        let steps = self.len();
        if steps < N {
            return None;
        }
        Some(std::array::from_fn(|i| self.codebooks[i][steps - N + i]))
    }

    /// Number of steps pushed.
    pub fn len(&self) -> usize {
        self.codebooks[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.codebooks[0].is_empty()
    }
}
