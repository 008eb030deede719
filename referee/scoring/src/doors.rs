use std::fmt;

/// One of the six gates of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Door {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
}

impl Door {
    pub const ALL: [Door; 6] = [
        Door::One,
        Door::Two,
        Door::Three,
        Door::Four,
        Door::Five,
        Door::Six,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_number(number: u8) -> Option<Self> {
        let index = number.checked_sub(1)?;
        Self::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for Door {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.number())
    }
}

/// Pass/fail vector. Every change yields a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Doors([bool; 6]);

impl Doors {
    pub const fn new(passed: [bool; 6]) -> Self {
        Self(passed)
    }

    pub fn passed(self, door: Door) -> bool {
        self.0[door.index()]
    }

    #[must_use]
    pub fn toggled(self, door: Door) -> Self {
        let mut slots = self.0;
        slots[door.index()] = !slots[door.index()];

        Self(slots)
    }

    pub fn iter(self) -> impl Iterator<Item = (Door, bool)> {
        Door::ALL
            .into_iter()
            .map(move |door| (door, self.passed(door)))
    }

    pub fn as_array(self) -> [bool; 6] {
        self.0
    }
}

/// Door vector as operated by the referee. Ignores toggles while disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DoorGrid {
    doors: Doors,
    disabled: bool,
}

impl DoorGrid {
    pub fn new(disabled: bool) -> Self {
        Self {
            doors: Doors::default(),
            disabled,
        }
    }

    pub fn doors(&self) -> Doors {
        self.doors
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Returns the new vector, or `None` when the grid is disabled.
    pub fn toggle(&mut self, door: Door) -> Option<Doors> {
        if self.disabled {
            return None;
        }

        self.doors = self.doors.toggled(door);
        Some(self.doors)
    }
}
