//! Tours: a playlist of timed camera primitives

use crate::feature::FeatureCore;
use crate::{Coordinates, GeoFeature, GeoNode, NodeType};

/// Camera target for a fly-to
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LookAt {
    pub coordinates: Coordinates,
    pub range: f64,
    pub heading: f64,
    pub tilt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlyToMode {
    #[default]
    Bounce,
    Smooth,
}

impl FlyToMode {
    pub fn as_kml(&self) -> &'static str {
        match self {
            FlyToMode::Bounce => "bounce",
            FlyToMode::Smooth => "smooth",
        }
    }

    pub fn from_kml(text: &str) -> Self {
        match text.trim() {
            "smooth" => FlyToMode::Smooth,
            _ => FlyToMode::Bounce,
        }
    }
}

/// What a tour control does when reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    Play,
    #[default]
    Pause,
}

impl PlayMode {
    pub fn as_kml(&self) -> &'static str {
        match self {
            PlayMode::Play => "play",
            PlayMode::Pause => "pause",
        }
    }

    pub fn from_kml(text: &str) -> Self {
        match text.trim() {
            "play" => PlayMode::Play,
            _ => PlayMode::Pause,
        }
    }
}

/// One step of a tour playlist
#[derive(Debug, Clone, PartialEq)]
pub enum TourPrimitive {
    Wait {
        duration: f64,
    },
    FlyTo {
        duration: f64,
        mode: FlyToMode,
        look_at: LookAt,
    },
    /// `delay` seconds pass before the sound starts
    SoundCue {
        href: String,
        delay: f64,
    },
    TourControl {
        play_mode: PlayMode,
    },
}

impl GeoNode for TourPrimitive {
    fn node_type(&self) -> NodeType {
        match self {
            TourPrimitive::Wait { .. } => NodeType::Wait,
            TourPrimitive::FlyTo { .. } => NodeType::FlyTo,
            TourPrimitive::SoundCue { .. } => NodeType::SoundCue,
            TourPrimitive::TourControl { .. } => NodeType::TourControl,
        }
    }
}

impl TourPrimitive {
    pub fn duration(&self) -> f64 {
        match self {
            TourPrimitive::Wait { duration } | TourPrimitive::FlyTo { duration, .. } => *duration,
            _ => 0.0,
        }
    }
}

/// Ordered primitives of a tour
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Playlist {
    pub id: String,
    primitives: Vec<TourPrimitive>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn primitive(&self, index: usize) -> Option<&TourPrimitive> {
        self.primitives.get(index)
    }

    pub fn primitives(&self) -> &[TourPrimitive] {
        &self.primitives
    }

    pub fn add_primitive(&mut self, primitive: TourPrimitive) {
        self.primitives.push(primitive);
    }

    /// Insert at `index`, clamped to the end; returns the index actually used
    pub fn insert_primitive(&mut self, index: usize, primitive: TourPrimitive) -> usize {
        let index = index.min(self.primitives.len());
        self.primitives.insert(index, primitive);
        index
    }

    pub fn remove_primitive_at(&mut self, index: usize) -> Option<TourPrimitive> {
        (index < self.primitives.len()).then(|| self.primitives.remove(index))
    }

    /// Returns false when either index is out of range
    pub fn swap_primitives(&mut self, a: usize, b: usize) -> bool {
        if a >= self.primitives.len() || b >= self.primitives.len() {
            return false;
        }
        self.primitives.swap(a, b);
        true
    }

    pub fn total_duration(&self) -> f64 {
        self.primitives.iter().map(TourPrimitive::duration).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tour {
    core: FeatureCore,
    pub playlist: Option<Playlist>,
}

impl GeoFeature for Tour {
    fn core(&self) -> &FeatureCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FeatureCore {
        &mut self.core
    }
}

impl Tour {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    /// Playlist, created on first use
    pub fn playlist_mut(&mut self) -> &mut Playlist {
        self.playlist.get_or_insert_with(Playlist::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait(duration: f64) -> TourPrimitive {
        TourPrimitive::Wait { duration }
    }

    fn pause() -> TourPrimitive {
        TourPrimitive::TourControl {
            play_mode: PlayMode::Pause,
        }
    }

    #[test]
    fn test_playlist_editing() {
        let mut playlist = Playlist::new();
        playlist.add_primitive(wait(1.0));
        playlist.add_primitive(pause());
        assert_eq!(playlist.insert_primitive(99, wait(3.0)), 2);

        assert!(playlist.swap_primitives(0, 1));
        assert_eq!(playlist.primitive(0), Some(&pause()));
        assert!(!playlist.swap_primitives(0, 7));

        assert_eq!(playlist.remove_primitive_at(2), Some(wait(3.0)));
        assert!(playlist.remove_primitive_at(2).is_none());
        assert_eq!(playlist.total_duration(), 1.0);
    }

    #[test]
    fn test_primitive_node_types() {
        assert_eq!(wait(0.0).node_type(), NodeType::Wait);
        assert_eq!(pause().node_type().as_str(), "GeoDataTourControlType");
    }

    #[test]
    fn test_play_mode_kml_names() {
        assert_eq!(PlayMode::from_kml(" play "), PlayMode::Play);
        assert_eq!(PlayMode::from_kml("pause"), PlayMode::Pause);
        assert_eq!(PlayMode::from_kml("unknown"), PlayMode::Pause);
        assert_eq!(PlayMode::Play.as_kml(), "play");
    }

    #[test]
    fn test_playlist_created_lazily() {
        let mut tour = Tour::new();
        assert!(tour.playlist().is_none());
        tour.playlist_mut().add_primitive(wait(2.0));
        assert_eq!(tour.playlist().map(Playlist::size), Some(1));
    }
}
