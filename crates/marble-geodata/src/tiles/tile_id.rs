use std::fmt;
use std::sync::Arc;

/// Deepest tile level any dataset is addressed at
pub const MAX_TILE_LEVEL: u32 = 30;

/// Address of one tile of one dataset
///
/// `map_id` is the dataset's source directory, so ids from different datasets never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    map_id: Arc<str>,
    zoom_level: u32,
    x: u32,
    y: u32,
}

impl TileId {
    pub fn new(map_id: impl Into<Arc<str>>, zoom_level: u32, x: u32, y: u32) -> Self {
        Self {
            map_id: map_id.into(),
            zoom_level,
            x,
            y,
        }
    }

    pub fn map_id(&self) -> &str {
        &self.map_id
    }

    pub fn zoom_level(&self) -> u32 {
        self.zoom_level
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    /// Tile at `level` covering this one; `None` when `level` is deeper
    pub fn ancestor(&self, level: u32) -> Option<Self> {
        let delta = self.zoom_level.checked_sub(level)?;
        Some(Self {
            map_id: Arc::clone(&self.map_id),
            zoom_level: level,
            x: self.x >> delta,
            y: self.y >> delta,
        })
    }

    /// `"<sourceDir>:<zoom>:<x>:<y>"`, the id carried through the download manager
    pub fn download_key(&self) -> String {
        format!("{}:{}:{}:{}", self.map_id, self.zoom_level, self.x, self.y)
    }

    /// Quad tree digits from the coarsest to the finest level, as used by quad key servers
    pub fn quad_index(&self) -> String {
        (0..=self.zoom_level)
            .rev()
            .map(|i| {
                let bit = |v: u32| v.checked_shr(i).unwrap_or(0) & 1;
                let digit = 2 * bit(self.y) + bit(self.x);
                char::from(b'0' + digit as u8)
            })
            .collect()
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.download_key())
    }
}

/// Inverse of [`TileId::download_key`]
pub fn parse_download_key(key: &str) -> Option<TileId> {
    let parts: Vec<&str> = key.split(':').filter(|p| !p.is_empty()).collect();
    let [map_id, zoom, x, y] = parts.as_slice() else {
        return None;
    };
    Some(TileId::new(
        *map_id,
        zoom.parse().ok()?,
        x.parse().ok()?,
        y.parse().ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_key_round_trip() {
        let id = TileId::new("earth/srtm2", 9, 511, 17);
        assert_eq!(id.download_key(), "earth/srtm2:9:511:17");
        assert_eq!(parse_download_key(&id.download_key()), Some(id));
        assert_eq!(parse_download_key("a:1:2"), None);
        assert_eq!(parse_download_key("a:one:2:3"), None);
    }

    #[test]
    fn test_ancestor() {
        let id = TileId::new("osm", 5, 21, 13);
        let parent = id.ancestor(3).unwrap();
        assert_eq!((parent.zoom_level(), parent.x(), parent.y()), (3, 5, 3));
        assert!(id.ancestor(6).is_none());
        assert_eq!(id.ancestor(5), Some(id));
    }

    #[test]
    fn test_quad_index() {
        assert_eq!(TileId::new("q", 0, 0, 0).quad_index(), "0");
        assert_eq!(TileId::new("q", 1, 1, 1).quad_index(), "03");
        assert_eq!(TileId::new("q", 2, 3, 1).quad_index(), "013");

        let deep = TileId::new("q", 40, 1, 0).quad_index();
        assert_eq!(deep.len(), 41);
        assert!(deep.ends_with("01"));
        assert!(deep.trim_end_matches('1').chars().all(|c| c == '0'));
    }
}
