/// Static terrain cells of a level map.
/// Hazard tiles, pickups and the door are entities, not terrain;
/// terrain never changes after a level is built.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Empty,
    Ground,
}

impl Tile {
    /// Can the player stand on / be blocked by this tile?
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Ground)
    }

    pub fn from_char(ch: char) -> Tile {
        match ch {
            '#' => Tile::Ground,
            _ => Tile::Empty,
        }
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ground_is_solid() {
        assert!(Tile::from_char('#').is_solid());
        assert!(!Tile::from_char(' ').is_solid());
        // Entity markers are not terrain
        assert!(!Tile::from_char('$').is_solid());
        assert!(!Tile::from_char('C').is_solid());
    }
}
