//! Deterministic interleaving of crawlers among scuttlers.

use colony_defence_core::MoverClass;

const PICK_TOLERANCE: f64 = 1e-9;

/// Accumulator that releases a crawler every time the running frequency sum
/// crosses one.
///
/// Over `n` committed picks the number of crawlers is `floor(n * f)` or
/// `ceil(n * f)` for any frequency `f` in `[0, 1]`.
#[derive(Clone, Debug)]
pub(crate) struct CrawlerCadence {
    frequency: f64,
    accumulated: f64,
}

impl CrawlerCadence {
    pub(crate) fn new(frequency: f32) -> Self {
        Self {
            frequency: f64::from(frequency).clamp(0.0, 1.0),
            accumulated: 0.0,
        }
    }

    /// Class the next committed pick will produce.
    pub(crate) fn peek(&self) -> MoverClass {
        if self.accumulated + self.frequency >= 1.0 - PICK_TOLERANCE {
            MoverClass::Crawler
        } else {
            MoverClass::Scuttler
        }
    }

    /// Consumes the pick returned by [`Self::peek`].
    pub(crate) fn commit(&mut self) -> MoverClass {
        let mover = self.peek();
        self.accumulated += self.frequency;
        if mover == MoverClass::Crawler {
            self.accumulated = (self.accumulated - 1.0).max(0.0);
        }
        mover
    }
}
