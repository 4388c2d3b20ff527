//! Visual categories of features and their default rendering

use crate::Color;

macro_rules! visual_categories {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Classification of a feature that drives its default style
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum VisualCategory {
            #[default]
            None,
            $($variant),+
        }

        impl VisualCategory {
            pub const ALL: &'static [VisualCategory] = &[VisualCategory::None, $(VisualCategory::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    VisualCategory::None => "None",
                    $(VisualCategory::$variant => $name),+
                }
            }
        }
    };
}

visual_categories! {
    Default => "Default",
    Unknown => "Unknown",
    SmallCity => "SmallCity",
    SmallCountyCapital => "SmallCountyCapital",
    SmallStateCapital => "SmallStateCapital",
    SmallNationCapital => "SmallNationCapital",
    MediumCity => "MediumCity",
    MediumStateCapital => "MediumStateCapital",
    MediumNationCapital => "MediumNationCapital",
    BigCity => "BigCity",
    BigNationCapital => "BigNationCapital",
    LargeCity => "LargeCity",
    LargeNationCapital => "LargeNationCapital",
    Nation => "Nation",
    Mountain => "Mountain",
    Volcano => "Volcano",
    Mons => "Mons",
    Valley => "Valley",
    Continent => "Continent",
    Ocean => "Ocean",
    OtherTerrain => "OtherTerrain",
    Crater => "Crater",
    Mare => "Mare",
    GeographicPole => "GeographicPole",
    MagneticPole => "MagneticPole",
    ShipWreck => "ShipWreck",
    AirPort => "AirPort",
    Observatory => "Observatory",
    Coordinate => "Coordinate",
    Bookmark => "Bookmark",
    NaturalWater => "NaturalWater",
    NaturalWood => "NaturalWood",
    NaturalBeach => "NaturalBeach",
    NaturalWetland => "NaturalWetland",
    NaturalGlacier => "NaturalGlacier",
    NaturalPeak => "NaturalPeak",
    NaturalTree => "NaturalTree",
    NaturalCave => "NaturalCave",
    AmenityRestaurant => "AmenityRestaurant",
    AmenityCafe => "AmenityCafe",
    AmenityPub => "AmenityPub",
    AmenityFastFood => "AmenityFastFood",
    AmenityHospital => "AmenityHospital",
    AmenityPharmacy => "AmenityPharmacy",
    AmenityPolice => "AmenityPolice",
    AmenityPostOffice => "AmenityPostOffice",
    AmenityLibrary => "AmenityLibrary",
    AmenityBank => "AmenityBank",
    AmenityFuel => "AmenityFuel",
    AmenityParking => "AmenityParking",
    AmenityToilets => "AmenityToilets",
    ShopSupermarket => "ShopSupermarket",
    ShopBakery => "ShopBakery",
    ShopBicycle => "ShopBicycle",
    LeisurePark => "LeisurePark",
    LeisurePlayground => "LeisurePlayground",
    LeisureStadium => "LeisureStadium",
    LeisureSwimmingPool => "LeisureSwimmingPool",
    LanduseForest => "LanduseForest",
    LanduseFarmland => "LanduseFarmland",
    LanduseResidential => "LanduseResidential",
    LanduseIndustrial => "LanduseIndustrial",
    LanduseCemetery => "LanduseCemetery",
    HighwayMotorway => "HighwayMotorway",
    HighwayTrunk => "HighwayTrunk",
    HighwayPrimary => "HighwayPrimary",
    HighwaySecondary => "HighwaySecondary",
    HighwayTertiary => "HighwayTertiary",
    HighwayResidential => "HighwayResidential",
    HighwayFootway => "HighwayFootway",
    HighwayCycleway => "HighwayCycleway",
    HighwayTrack => "HighwayTrack",
    RailwayRail => "RailwayRail",
    RailwayStation => "RailwayStation",
    Building => "Building",
    TransportBusStop => "TransportBusStop",
    TransportTramStop => "TransportTramStop",
    TourismHotel => "TourismHotel",
    TourismMuseum => "TourismMuseum",
    TourismViewPoint => "TourismViewPoint",
    HistoricCastle => "HistoricCastle",
    HistoricMonument => "HistoricMonument",
    Satellite => "Satellite",
}

impl VisualCategory {
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == name)
    }

    pub(crate) fn to_index(self) -> u16 {
        Self::ALL.iter().position(|c| *c == self).unwrap_or(0) as u16
    }

    pub(crate) fn from_index(index: u16) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Category for an OpenStreetMap `key=value` tag
    pub fn from_osm_tag(key: &str, value: &str) -> Option<Self> {
        use VisualCategory::*;
        let category = match (key, value) {
            ("natural", "water") | ("waterway", "riverbank") => NaturalWater,
            ("natural", "wood") => NaturalWood,
            ("natural", "beach") => NaturalBeach,
            ("natural", "wetland") => NaturalWetland,
            ("natural", "glacier") => NaturalGlacier,
            ("natural", "peak") => NaturalPeak,
            ("natural", "tree") => NaturalTree,
            ("natural", "cave_entrance") => NaturalCave,
            ("natural", "volcano") => Volcano,
            ("amenity", "restaurant") => AmenityRestaurant,
            ("amenity", "cafe") => AmenityCafe,
            ("amenity", "pub") | ("amenity", "bar") => AmenityPub,
            ("amenity", "fast_food") => AmenityFastFood,
            ("amenity", "hospital") => AmenityHospital,
            ("amenity", "pharmacy") => AmenityPharmacy,
            ("amenity", "police") => AmenityPolice,
            ("amenity", "post_office") => AmenityPostOffice,
            ("amenity", "library") => AmenityLibrary,
            ("amenity", "bank") => AmenityBank,
            ("amenity", "fuel") => AmenityFuel,
            ("amenity", "parking") => AmenityParking,
            ("amenity", "toilets") => AmenityToilets,
            ("shop", "supermarket") => ShopSupermarket,
            ("shop", "bakery") => ShopBakery,
            ("shop", "bicycle") => ShopBicycle,
            ("leisure", "park") => LeisurePark,
            ("leisure", "playground") => LeisurePlayground,
            ("leisure", "stadium") => LeisureStadium,
            ("leisure", "swimming_pool") => LeisureSwimmingPool,
            ("landuse", "forest") => LanduseForest,
            ("landuse", "farmland") => LanduseFarmland,
            ("landuse", "residential") => LanduseResidential,
            ("landuse", "industrial") => LanduseIndustrial,
            ("landuse", "cemetery") => LanduseCemetery,
            ("highway", "motorway") | ("highway", "motorway_link") => HighwayMotorway,
            ("highway", "trunk") | ("highway", "trunk_link") => HighwayTrunk,
            ("highway", "primary") | ("highway", "primary_link") => HighwayPrimary,
            ("highway", "secondary") | ("highway", "secondary_link") => HighwaySecondary,
            ("highway", "tertiary") | ("highway", "tertiary_link") => HighwayTertiary,
            ("highway", "residential") | ("highway", "living_street") => HighwayResidential,
            ("highway", "footway") | ("highway", "path") | ("highway", "pedestrian") => {
                HighwayFootway
            }
            ("highway", "cycleway") => HighwayCycleway,
            ("highway", "track") => HighwayTrack,
            ("highway", "bus_stop") => TransportBusStop,
            ("railway", "rail") => RailwayRail,
            ("railway", "station") => RailwayStation,
            ("railway", "tram_stop") => TransportTramStop,
            ("tourism", "hotel") => TourismHotel,
            ("tourism", "museum") => TourismMuseum,
            ("tourism", "viewpoint") => TourismViewPoint,
            ("historic", "castle") => HistoricCastle,
            ("historic", "monument") | ("historic", "memorial") => HistoricMonument,
            ("aeroway", "aerodrome") => AirPort,
            ("building", _) => Building,
            _ => return Option::None,
        };
        Some(category)
    }

    pub fn default_icon_path(&self) -> &'static str {
        use VisualCategory::*;
        match self {
            None | Default | Unknown => "",
            SmallCity | MediumCity | BigCity | LargeCity => "bitmaps/city_4_white.png",
            SmallCountyCapital | SmallStateCapital | MediumStateCapital => {
                "bitmaps/city_4_orange.png"
            }
            SmallNationCapital | MediumNationCapital | BigNationCapital | LargeNationCapital => {
                "bitmaps/city_4_red.png"
            }
            Nation | Continent | Ocean => "",
            Mountain | Mons | NaturalPeak => "bitmaps/mountain_1.png",
            Volcano => "bitmaps/volcano_1.png",
            Valley => "bitmaps/valley.png",
            OtherTerrain => "bitmaps/other.png",
            Crater => "bitmaps/crater.png",
            Mare => "bitmaps/mare.png",
            GeographicPole => "bitmaps/pole_1.png",
            MagneticPole => "bitmaps/pole_2.png",
            ShipWreck => "bitmaps/shipwreck.png",
            AirPort => "bitmaps/airport.png",
            Observatory => "bitmaps/observatory.png",
            Coordinate => "bitmaps/coordinate.png",
            Bookmark => "bitmaps/bookmark.png",
            NaturalTree => "bitmaps/osm/individual/tree.png",
            NaturalCave => "bitmaps/osm/individual/cave.png",
            AmenityRestaurant => "bitmaps/osm/food/restaurant.png",
            AmenityCafe => "bitmaps/osm/food/cafe.png",
            AmenityPub => "bitmaps/osm/food/pub.png",
            AmenityFastFood => "bitmaps/osm/food/fastfood.png",
            AmenityHospital => "bitmaps/osm/health/hospital.png",
            AmenityPharmacy => "bitmaps/osm/health/pharmacy.png",
            AmenityPolice => "bitmaps/osm/amenity/police.png",
            AmenityPostOffice => "bitmaps/osm/amenity/post_office.png",
            AmenityLibrary => "bitmaps/osm/amenity/library.png",
            AmenityBank => "bitmaps/osm/money/bank.png",
            AmenityFuel => "bitmaps/osm/transportation/fuel.png",
            AmenityParking => "bitmaps/osm/transportation/parking.png",
            AmenityToilets => "bitmaps/osm/amenity/toilets.png",
            ShopSupermarket => "bitmaps/osm/shop/supermarket.png",
            ShopBakery => "bitmaps/osm/shop/bakery.png",
            ShopBicycle => "bitmaps/osm/shop/bicycle.png",
            LeisurePlayground => "bitmaps/osm/leisure/playground.png",
            LeisureSwimmingPool => "bitmaps/osm/leisure/swimming_pool.png",
            RailwayStation => "bitmaps/osm/transportation/railway_station.png",
            TransportBusStop => "bitmaps/osm/transportation/bus_stop.png",
            TransportTramStop => "bitmaps/osm/transportation/tram_stop.png",
            TourismHotel => "bitmaps/osm/accommodation/hotel.png",
            TourismMuseum => "bitmaps/osm/tourism/museum.png",
            TourismViewPoint => "bitmaps/osm/tourism/viewpoint.png",
            HistoricCastle => "bitmaps/osm/tourism/castle.png",
            HistoricMonument => "bitmaps/osm/tourism/monument.png",
            Satellite => "bitmaps/satellite.png",
            _ => "",
        }
    }

    /// Fill color, outline color and line width used for area and line geometries
    pub fn default_colors(&self) -> (Color, Color, f32) {
        use VisualCategory::*;
        match self {
            NaturalWater => (
                Color::rgba(0xb5, 0xd0, 0xd0, 0xff),
                Color::rgba(0xb5, 0xd0, 0xd0, 0xff),
                1.0,
            ),
            NaturalWood | LanduseForest => (
                Color::rgba(0x6f, 0xc1, 0x8e, 0xff),
                Color::rgba(0x6f, 0xc1, 0x8e, 0xff),
                1.0,
            ),
            NaturalBeach => (
                Color::rgba(0xf1, 0xe2, 0xb6, 0xff),
                Color::rgba(0xf1, 0xe2, 0xb6, 0xff),
                1.0,
            ),
            NaturalWetland => (
                Color::rgba(0xdd, 0xec, 0xec, 0xff),
                Color::rgba(0xdd, 0xec, 0xec, 0xff),
                1.0,
            ),
            NaturalGlacier => (
                Color::rgba(0xdd, 0xec, 0xec, 0xff),
                Color::rgba(0xdd, 0xec, 0xec, 0xff),
                1.0,
            ),
            LeisurePark | LeisurePlayground => (
                Color::rgba(0xcd, 0xf6, 0xca, 0xff),
                Color::rgba(0xa1, 0xd5, 0x9e, 0xff),
                1.0,
            ),
            LeisureStadium | LeisureSwimmingPool => (
                Color::rgba(0x33, 0xcc, 0x99, 0xff),
                Color::rgba(0x89, 0xd2, 0xae, 0xff),
                1.0,
            ),
            LanduseFarmland => (
                Color::rgba(0xee, 0xf0, 0xd5, 0xff),
                Color::rgba(0xee, 0xf0, 0xd5, 0xff),
                1.0,
            ),
            LanduseResidential => (
                Color::rgba(0xe0, 0xdf, 0xdf, 0xff),
                Color::rgba(0xe0, 0xdf, 0xdf, 0xff),
                1.0,
            ),
            LanduseIndustrial => (
                Color::rgba(0xeb, 0xdb, 0xe8, 0xff),
                Color::rgba(0xeb, 0xdb, 0xe8, 0xff),
                1.0,
            ),
            LanduseCemetery => (
                Color::rgba(0xaa, 0xcb, 0xaf, 0xff),
                Color::rgba(0xaa, 0xcb, 0xaf, 0xff),
                1.0,
            ),
            Building => (
                Color::rgba(0xbe, 0xad, 0xad, 0xff),
                Color::rgba(0xbe, 0xad, 0xad, 0xff),
                1.0,
            ),
            HighwayMotorway => (
                Color::WHITE,
                Color::rgba(0xe8, 0x92, 0xa2, 0xff),
                9.0,
            ),
            HighwayTrunk => (
                Color::WHITE,
                Color::rgba(0xf9, 0xb2, 0x9c, 0xff),
                9.0,
            ),
            HighwayPrimary => (
                Color::WHITE,
                Color::rgba(0xfc, 0xd6, 0xa4, 0xff),
                8.0,
            ),
            HighwaySecondary => (
                Color::WHITE,
                Color::rgba(0xf7, 0xfa, 0xbf, 0xff),
                8.0,
            ),
            HighwayTertiary | HighwayResidential => (Color::WHITE, Color::WHITE, 6.0),
            HighwayFootway => (
                Color::WHITE,
                Color::rgba(0xfa, 0x80, 0x72, 0xff),
                2.0,
            ),
            HighwayCycleway => (Color::WHITE, Color::rgba(0, 0, 0xff, 0xff), 2.0),
            HighwayTrack => (
                Color::WHITE,
                Color::rgba(0x99, 0x66, 0x00, 0xff),
                1.0,
            ),
            RailwayRail => (
                Color::WHITE,
                Color::rgba(0x70, 0x6e, 0x70, 0xff),
                2.0,
            ),
            _ => (Color::WHITE, Color::BLACK, 1.0),
        }
    }

    pub fn default_label_color(&self) -> Color {
        use VisualCategory::*;
        match self {
            Ocean | NaturalWater => Color::rgba(0x1c, 0x6b, 0xa5, 0xff),
            Nation | Continent => Color::rgba(0xbf, 0x03, 0x03, 0xff),
            Mountain | Mons | Volcano | Valley | NaturalPeak => {
                Color::rgba(0x66, 0x33, 0x00, 0xff)
            }
            _ => Color::BLACK,
        }
    }
}
