use std::borrow::Cow;
use std::time::{Duration, Instant};

pub struct ScopedTimer {
    label: Cow<'static, str>,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::debug!("{} finished in {:.2?}", self.label, self.elapsed());
    }
}
