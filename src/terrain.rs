use crate::constants::*;
use crate::location::*;
use bitflags::*;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TerrainFlags: u8 {
        const NONE = 0;
        const WALL = 1;
        const SWAMP = 2;
    }
}

/// Number of tiles in a room terrain buffer.
pub const ROOM_AREA: usize = (ROOM_WIDTH as usize) * (ROOM_HEIGHT as usize);

/// Row-major copy of the game's raw terrain buffer.
#[derive(Clone)]
pub struct FastRoomTerrain {
    buffer: Vec<u8>,
}

impl FastRoomTerrain {
    pub fn new(buffer: Vec<u8>) -> FastRoomTerrain {
        FastRoomTerrain { buffer }
    }

    /// A room with no walls or swamps.
    pub fn plain() -> FastRoomTerrain {
        FastRoomTerrain {
            buffer: vec![0; ROOM_AREA],
        }
    }

    /// True when the buffer covers exactly one room.
    pub fn is_complete(&self) -> bool {
        self.buffer.len() == ROOM_AREA
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn get(&self, pos: &Location) -> TerrainFlags {
        self.get_xy(pos.x(), pos.y())
    }

    pub fn get_xy(&self, x: u8, y: u8) -> TerrainFlags {
        let index = (y as usize * ROOM_WIDTH as usize) + (x as usize);
        self.buffer
            .get(index)
            .map(|bits| TerrainFlags::from_bits_truncate(*bits))
            .unwrap_or(TerrainFlags::WALL)
    }

    pub fn set_xy(&mut self, x: u8, y: u8, flags: TerrainFlags) {
        let index = (y as usize * ROOM_WIDTH as usize) + (x as usize);
        if let Some(slot) = self.buffer.get_mut(index) {
            *slot = flags.bits();
        }
    }

    pub fn is_wall(&self, x: u8, y: u8) -> bool {
        self.get_xy(x, y).contains(TerrainFlags::WALL)
    }

    pub fn is_wall_at(&self, loc: Location) -> bool {
        self.is_wall(loc.x(), loc.y())
    }

    pub fn is_swamp(&self, x: u8, y: u8) -> bool {
        self.get_xy(x, y).contains(TerrainFlags::SWAMP)
    }
}

/// A 50x50 array for room-sized data.
#[derive(Clone)]
pub struct RoomDataArray<T: Copy> {
    data: Vec<T>,
}

impl<T: Copy> RoomDataArray<T> {
    pub fn new(initial: T) -> Self {
        RoomDataArray {
            data: vec![initial; ROOM_AREA],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        let index = y * (ROOM_WIDTH as usize) + x;
        &self.data[index]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let index = y * (ROOM_WIDTH as usize) + x;
        &mut self.data[index]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        *self.get_mut(x, y) = value;
    }

    #[inline]
    pub fn at(&self, loc: Location) -> T {
        *self.get(loc.x() as usize, loc.y() as usize)
    }

    #[inline]
    pub fn set_at(&mut self, loc: Location, value: T) {
        self.set(loc.x() as usize, loc.y() as usize, value);
    }
}

/// Neighbor offsets for 8-directional movement.
pub const NEIGHBORS_8: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
];

/// Neighbor offsets for 4-directional (cardinal) movement.
pub const NEIGHBORS_4: [(i8, i8); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];
