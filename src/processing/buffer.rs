// BUFFER COMPONENT ------------------------------------------------------------

/// Fixed-capacity FIFO window of reflectance samples for one channel.
#[derive(Clone, Debug)]
pub struct SignalBuffer {
    buffer: Vec<f64>,
    capacity: usize,
    start: usize,
    len: usize,
}

impl SignalBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "signal buffer capacity must be non-zero");
        Self {
            buffer: vec![0.0; capacity],
            capacity,
            start: 0,
            len: 0,
        }
    }

    /// Appends to the tail, evicting the oldest sample once full.
    pub fn push(&mut self, sample: f64) {
        let end = (self.start + self.len) % self.capacity;
        self.buffer[end] = sample;
        if self.len == self.capacity {
            self.start = (self.start + 1) % self.capacity; // Overwrite oldest if full
        } else {
            self.len += 1;
        }
    }

    /// Current contents, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        (0..self.len)
            .map(|i| self.buffer[(self.start + i) % self.capacity])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
