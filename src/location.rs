use crate::constants::*;
use serde::*;
use std::fmt;
use std::str::FromStr;

/// A tile inside a single room, packed as `x << 8 | y`.
///
/// Ordering follows the packed value (column-major), which is what the planner
/// relies on whenever it needs a stable iteration order over tiles.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Location {
    packed: u16,
}

impl Location {
    pub fn from_coords(x: u32, y: u32) -> Self {
        Location {
            packed: ((x << 8) | y) as u16,
        }
    }

    #[inline]
    pub fn from_xy(x: u8, y: u8) -> Self {
        Location::from_coords(x as u32, y as u32)
    }

    #[inline]
    pub fn x(self) -> u8 {
        ((self.packed >> 8) & 0xFF) as u8
    }

    #[inline]
    pub fn y(self) -> u8 {
        (self.packed & 0xFF) as u8
    }

    /// Offset this location, returning `None` when the result leaves the room.
    pub fn checked_add(self, dx: i8, dy: i8) -> Option<Location> {
        let x = self.x() as i16 + dx as i16;
        let y = self.y() as i16 + dy as i16;
        if (0..ROOM_WIDTH as i16).contains(&x) && (0..ROOM_HEIGHT as i16).contains(&y) {
            Some(Location::from_xy(x as u8, y as u8))
        } else {
            None
        }
    }

    /// Chebyshev distance (the game's notion of range).
    pub fn distance_to(self, other: Self) -> u8 {
        let dx = (self.x() as i16 - other.x() as i16).unsigned_abs();
        let dy = (self.y() as i16 - other.y() as i16).unsigned_abs();

        dx.max(dy) as u8
    }

    pub fn manhattan_to(self, other: Self) -> u32 {
        let dx = (self.x() as i32 - other.x() as i32).unsigned_abs();
        let dy = (self.y() as i32 - other.y() as i32).unsigned_abs();

        dx + dy
    }

    pub fn in_room_bounds(self) -> bool {
        self.x() < ROOM_WIDTH && self.y() < ROOM_HEIGHT
    }

    /// True for tiles a structure may be placed on (not an exit tile).
    pub fn in_build_bounds(self) -> bool {
        (ROOM_BUILD_MIN..=ROOM_BUILD_MAX).contains(&self.x())
            && (ROOM_BUILD_MIN..=ROOM_BUILD_MAX).contains(&self.y())
    }

    /// Tiles at exactly Chebyshev `radius` from this one, clipped to the room.
    pub fn ring(self, radius: u8) -> Vec<Location> {
        if radius == 0 {
            return vec![self];
        }

        let r = radius as i16;
        let mut tiles = Vec::with_capacity(8 * radius as usize);
        for dy in -r..=r {
            for dx in -r..=r {
                if dx.abs().max(dy.abs()) != r {
                    continue;
                }
                let x = self.x() as i16 + dx;
                let y = self.y() as i16 + dy;
                if (0..ROOM_WIDTH as i16).contains(&x) && (0..ROOM_HEIGHT as i16).contains(&y) {
                    tiles.push(Location::from_xy(x as u8, y as u8));
                }
            }
        }
        tiles
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x(), self.y())
    }
}

/// Reasons a persisted `"x,y"` coordinate could not be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseLocationError {
    Malformed,
    OutOfBounds,
}

impl FromStr for Location {
    type Err = ParseLocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s.split_once(',').ok_or(ParseLocationError::Malformed)?;
        let x: i64 = x.trim().parse().map_err(|_| ParseLocationError::Malformed)?;
        let y: i64 = y.trim().parse().map_err(|_| ParseLocationError::Malformed)?;

        if !(0..ROOM_WIDTH as i64).contains(&x) || !(0..ROOM_HEIGHT as i64).contains(&y) {
            return Err(ParseLocationError::OutOfBounds);
        }

        Ok(Location::from_coords(x as u32, y as u32))
    }
}

impl Serialize for Location {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|e| de::Error::custom(format!("invalid location {:?}: {:?}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_persisted_coordinates() {
        assert_eq!("12,34".parse(), Ok(Location::from_xy(12, 34)));
        assert_eq!(" 0, 49".parse(), Ok(Location::from_xy(0, 49)));
        assert_eq!(
            "50,3".parse::<Location>(),
            Err(ParseLocationError::OutOfBounds)
        );
        assert_eq!(
            "-1,3".parse::<Location>(),
            Err(ParseLocationError::OutOfBounds)
        );
        assert_eq!(
            "banana".parse::<Location>(),
            Err(ParseLocationError::Malformed)
        );
    }

    #[test]
    fn ring_is_clipped_to_room() {
        assert_eq!(Location::from_xy(25, 25).ring(1).len(), 8);
        assert_eq!(Location::from_xy(25, 25).ring(2).len(), 16);
        assert_eq!(Location::from_xy(0, 0).ring(1).len(), 3);
    }

    #[test]
    fn distances() {
        let a = Location::from_xy(10, 10);
        let b = Location::from_xy(13, 14);
        assert_eq!(a.distance_to(b), 4);
        assert_eq!(a.manhattan_to(b), 7);
        assert_eq!(a.checked_add(-11, 0), None);
    }
}
