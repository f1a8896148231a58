//! Fixed-delay periodic tasks driven by the physics clock.

/// A repeating task that fires every `delay` seconds of accumulated time.
///
/// Entities and sensors each own one. Cancelling is immediate: a cancelled
/// task reports no further firings, even for time already accumulated.
#[derive(Debug, Clone, Default)]
pub struct PeriodicTask {
    delay: f32,
    elapsed: f32,
    running: bool,
}

impl PeriodicTask {
    pub fn new(delay: f32) -> Self {
        Self {
            delay,
            elapsed: 0.0,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// (Re)start from zero; the first firing comes one `delay` later
    pub fn start(&mut self) {
        self.elapsed = 0.0;
        self.running = true;
    }

    pub fn cancel(&mut self) {
        self.running = false;
        self.elapsed = 0.0;
    }

    /// Accumulate `dt` and return how many firings are due.
    ///
    /// A non-positive delay fires once per advance.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if !self.running {
            return 0;
        }
        if self.delay <= 0.0 {
            return 1;
        }

        self.elapsed += dt;
        let mut firings = 0;
        while self.elapsed >= self.delay {
            self.elapsed -= self.delay;
            firings += 1;
        }
        firings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_running_never_fires() {
        let mut task = PeriodicTask::new(0.1);
        assert_eq!(task.advance(10.0), 0);
    }

    #[test]
    fn test_fires_on_delay() {
        let mut task = PeriodicTask::new(0.5);
        task.start();
        assert_eq!(task.advance(0.25), 0);
        assert_eq!(task.advance(0.25), 1);
        assert_eq!(task.advance(1.0), 2);
    }

    #[test]
    fn test_cancel_drops_accumulated_time() {
        let mut task = PeriodicTask::new(1.0);
        task.start();
        task.advance(0.75);
        task.cancel();
        assert_eq!(task.advance(5.0), 0);

        task.start();
        assert_eq!(task.advance(0.5), 0);
    }

    #[test]
    fn test_zero_delay_fires_every_advance() {
        let mut task = PeriodicTask::new(0.0);
        task.start();
        assert_eq!(task.advance(0.02), 1);
        assert_eq!(task.advance(0.02), 1);
    }
}
