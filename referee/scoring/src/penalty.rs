/// Penalty count for a run. Never negative, optionally capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PenaltyCounter {
    value: u32,
    max: Option<u32>,
}

impl PenaltyCounter {
    pub fn new(max: Option<u32>) -> Self {
        Self { value: 0, max }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    pub fn increment(&mut self) -> u32 {
        let next = self.value.saturating_add(1);
        self.value = match self.max {
            Some(max) => next.min(max),
            None => next,
        };

        self.value
    }

    pub fn decrement(&mut self) -> u32 {
        self.value = self.value.saturating_sub(1);
        self.value
    }
}
