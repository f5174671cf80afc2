/// One eye of a stereo pair. Drivers always order render passes left-then-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialization", derive(serde::Deserialize, serde::Serialize))]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// Index used for per-eye arrays and viewport layout (left = 0, right = 1).
    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}
