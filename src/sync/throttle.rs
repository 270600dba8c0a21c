/// Leading-edge rate limiter: the first call in each interval passes, the rest are dropped.
#[derive(Clone, Debug)]
pub struct Throttle {
    interval: f64,
    last: Option<f64>,
}

impl Throttle {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn try_acquire(&mut self, now: f64) -> bool {
        if let Some(last) = self.last
            && now - last < self.interval
        {
            return false;
        }
        self.last = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
