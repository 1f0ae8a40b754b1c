//! Geographic resolver: center+expanse or explicit bounds -> [`BoundingBox`].
//!
//! Latitudes are clamped (center+expanse) or validated (explicit bounds) to
//! [-90, 90]. Longitudes are wrapped into one [`LongitudeConvention`] with
//! Euclidean modulo. Boxes that would straddle the convention's seam are
//! rejected rather than split.

use crate::error::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};

const FULL_TURN: f64 = 360.0;

/// Longitude range used for every box of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LongitudeConvention {
    /// [-180, 180]
    #[default]
    Signed,
    /// [0, 360]
    Unsigned,
}

impl LongitudeConvention {
    /// Lower end of the range (the seam).
    pub fn start(self) -> f64 {
        match self {
            LongitudeConvention::Signed => -180.0,
            LongitudeConvention::Unsigned => 0.0,
        }
    }

    pub fn end(self) -> f64 {
        self.start() + FULL_TURN
    }

    /// Canonical representative of `lon` in `[start, end)`.
    pub fn normalize(self, lon: f64) -> f64 {
        let start = self.start();
        (lon - start).rem_euclid(FULL_TURN) + start
    }

    /// Upper bound of a non-degenerate box, in `(start, end]`: landing on
    /// the seam means the box ends there, not that it starts there.
    fn normalize_upper(self, lon: f64) -> f64 {
        let n = self.normalize(lon);
        if n == self.start() {
            self.end()
        } else {
            n
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
}

impl BoundingBox {
    /// Box of `height_deg` x `width_deg` centered on a point. Latitude is
    /// clamped silently; width >= 360 covers the whole convention range.
    pub fn from_center_and_expanse(
        center_lat: f64,
        center_lon: f64,
        height_deg: f64,
        width_deg: f64,
        convention: LongitudeConvention,
    ) -> QueryResult<Self> {
        for (name, v) in [
            ("center latitude", center_lat),
            ("center longitude", center_lon),
            ("height", height_deg),
            ("width", width_deg),
        ] {
            if !v.is_finite() {
                return Err(QueryError::InvalidBounds(format!("{name} is not finite")));
            }
        }
        if height_deg < 0.0 || width_deg < 0.0 {
            return Err(QueryError::InvalidBounds(format!(
                "expanse must be non-negative (height {height_deg}, width {width_deg})"
            )));
        }

        let half_height = height_deg / 2.0;
        let lat_min = clamp_latitude(center_lat - half_height);
        let lat_max = clamp_latitude(center_lat + half_height);

        let (lon_min, lon_max) = if width_deg >= FULL_TURN {
            (convention.start(), convention.end())
        } else if width_deg == 0.0 {
            let lon = convention.normalize(center_lon);
            (lon, lon)
        } else {
            let center = convention.normalize(center_lon);
            let half_width = width_deg / 2.0;
            (
                convention.normalize(center - half_width),
                convention.normalize_upper(center + half_width),
            )
        };

        Self::checked(lat_min, lat_max, lon_min, lon_max)
    }

    /// Box from explicit edges. Latitudes must already be in [-90, 90];
    /// longitudes are normalized into `convention`, and a span of 360 or more
    /// covers the whole range.
    pub fn from_explicit_bounds(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        convention: LongitudeConvention,
    ) -> QueryResult<Self> {
        for (name, v) in [
            ("lat_min", lat_min),
            ("lat_max", lat_max),
            ("lon_min", lon_min),
            ("lon_max", lon_max),
        ] {
            if !v.is_finite() {
                return Err(QueryError::InvalidBounds(format!("{name} is not finite")));
            }
        }
        for (name, lat) in [("lat_min", lat_min), ("lat_max", lat_max)] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(QueryError::InvalidBounds(format!(
                    "{name} {lat} outside [-90, 90]"
                )));
            }
        }

        let (lon_min_n, lon_max_n) = if lon_max - lon_min >= FULL_TURN {
            (convention.start(), convention.end())
        } else if lon_max == lon_min {
            let lon = convention.normalize(lon_min);
            (lon, lon)
        } else {
            (
                convention.normalize(lon_min),
                convention.normalize_upper(lon_max),
            )
        };
        Self::checked(lat_min, lat_max, lon_min_n, lon_max_n)
    }

    fn checked(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> QueryResult<Self> {
        if lat_min > lat_max {
            return Err(QueryError::InvalidBounds(format!(
                "lat_min {lat_min} is greater than lat_max {lat_max}"
            )));
        }
        if lon_min > lon_max {
            return Err(QueryError::InvalidBounds(format!(
                "longitude range {lon_min}..{lon_max} wraps the antimeridian"
            )));
        }
        Ok(BoundingBox {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        })
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }
}

/// Constrain latitude to [-90, 90].
pub fn clamp_latitude(latitude: f64) -> f64 {
    latitude.clamp(-90.0, 90.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use LongitudeConvention::{Signed, Unsigned};

    #[test]
    fn clamp_latitude_bounds() {
        assert_eq!(clamp_latitude(45.0), 45.0);
        assert_eq!(clamp_latitude(90.0), 90.0);
        assert_eq!(clamp_latitude(100.0), 90.0);
        assert_eq!(clamp_latitude(-91.0), -90.0);
    }

    #[test]
    fn normalize_unsigned() {
        assert_eq!(Unsigned.normalize(0.0), 0.0);
        assert_eq!(Unsigned.normalize(359.0), 359.0);
        assert_eq!(Unsigned.normalize(-1.0), 359.0);
        assert_eq!(Unsigned.normalize(-180.0), 180.0);
        assert_eq!(Unsigned.normalize(361.0), 1.0);
        assert_eq!(Unsigned.normalize(720.0), 0.0);
    }

    #[test]
    fn normalize_signed() {
        assert_eq!(Signed.normalize(0.0), 0.0);
        assert_eq!(Signed.normalize(180.0), -180.0);
        assert_eq!(Signed.normalize(190.0), -170.0);
        assert_eq!(Signed.normalize(-190.0), 170.0);
        assert_eq!(Signed.normalize(-540.0), -180.0);
        assert_eq!(Signed.normalize(359.0), -1.0);
    }

    #[test]
    fn center_and_expanse_simple() {
        let b = BoundingBox::from_center_and_expanse(0.0, 0.0, 10.0, 10.0, Signed).unwrap();
        assert_eq!((b.lat_min(), b.lat_max()), (-5.0, 5.0));
        assert_eq!((b.lon_min(), b.lon_max()), (-5.0, 5.0));
    }

    #[test]
    fn center_and_expanse_clamps_at_poles() {
        let b = BoundingBox::from_center_and_expanse(85.0, -93.0, 20.0, 10.0, Signed).unwrap();
        assert_eq!((b.lat_min(), b.lat_max()), (75.0, 90.0));
        let b = BoundingBox::from_center_and_expanse(-85.0, -93.0, 20.0, 10.0, Signed).unwrap();
        assert_eq!((b.lat_min(), b.lat_max()), (-90.0, -75.0));
        assert_eq!((b.lon_min(), b.lon_max()), (-98.0, -88.0));
    }

    #[test]
    fn zero_expanse_is_degenerate() {
        for conv in [Signed, Unsigned] {
            for (lat, lon) in [(45.0, -93.0), (0.0, 0.0), (-30.0, 180.0), (89.0, 359.5)] {
                let b = BoundingBox::from_center_and_expanse(lat, lon, 0.0, 0.0, conv).unwrap();
                assert_eq!(b.lat_min(), b.lat_max());
                assert_eq!(b.lon_min(), b.lon_max());
            }
        }
    }

    #[test]
    fn negative_center_in_unsigned_convention() {
        let b = BoundingBox::from_center_and_expanse(45.0, -93.0, 10.0, 20.0, Unsigned).unwrap();
        assert_eq!((b.lon_min(), b.lon_max()), (257.0, 277.0));
    }

    #[test]
    fn box_touching_seam_is_kept() {
        let b = BoundingBox::from_center_and_expanse(0.0, 350.0, 10.0, 20.0, Unsigned).unwrap();
        assert_eq!((b.lon_min(), b.lon_max()), (340.0, 360.0));
        let b = BoundingBox::from_center_and_expanse(0.0, 175.0, 10.0, 10.0, Signed).unwrap();
        assert_eq!((b.lon_min(), b.lon_max()), (170.0, 180.0));
    }

    #[test]
    fn box_crossing_seam_is_rejected() {
        let err = BoundingBox::from_center_and_expanse(0.0, 0.0, 10.0, 10.0, Unsigned);
        assert!(matches!(err, Err(QueryError::InvalidBounds(_))));
        let err = BoundingBox::from_center_and_expanse(0.0, 180.0, 10.0, 10.0, Signed);
        assert!(matches!(err, Err(QueryError::InvalidBounds(_))));
    }

    #[test]
    fn full_width_covers_range() {
        let b = BoundingBox::from_center_and_expanse(0.0, 42.0, 180.0, 400.0, Signed).unwrap();
        assert_eq!((b.lat_min(), b.lat_max()), (-90.0, 90.0));
        assert_eq!((b.lon_min(), b.lon_max()), (-180.0, 180.0));
    }

    #[test]
    fn negative_or_nan_expanse_rejected() {
        assert!(BoundingBox::from_center_and_expanse(0.0, 0.0, -1.0, 10.0, Signed).is_err());
        assert!(BoundingBox::from_center_and_expanse(0.0, f64::NAN, 1.0, 10.0, Signed).is_err());
    }

    #[test]
    fn explicit_bounds_validation() {
        let b = BoundingBox::from_explicit_bounds(30.0, 50.0, -100.0, -80.0, Unsigned).unwrap();
        assert_eq!((b.lon_min(), b.lon_max()), (260.0, 280.0));

        let b = BoundingBox::from_explicit_bounds(-10.0, 10.0, -10.0, 180.0, Signed).unwrap();
        assert_eq!((b.lon_min(), b.lon_max()), (-10.0, 180.0));

        assert!(matches!(
            BoundingBox::from_explicit_bounds(50.0, 30.0, 0.0, 10.0, Signed),
            Err(QueryError::InvalidBounds(_))
        ));
        assert!(matches!(
            BoundingBox::from_explicit_bounds(-95.0, 30.0, 0.0, 10.0, Signed),
            Err(QueryError::InvalidBounds(_))
        ));
        assert!(matches!(
            BoundingBox::from_explicit_bounds(0.0, 10.0, 170.0, -170.0, Signed),
            Err(QueryError::InvalidBounds(_))
        ));
    }

    #[test]
    fn explicit_full_turn_covers_range_in_either_convention() {
        let b = BoundingBox::from_explicit_bounds(-10.0, 10.0, 0.0, 360.0, Signed).unwrap();
        assert_eq!((b.lon_min(), b.lon_max()), (-180.0, 180.0));
        let b = BoundingBox::from_explicit_bounds(-10.0, 10.0, -180.0, 180.0, Unsigned).unwrap();
        assert_eq!((b.lon_min(), b.lon_max()), (0.0, 360.0));
        let b = BoundingBox::from_explicit_bounds(-10.0, 10.0, -200.0, 200.0, Signed).unwrap();
        assert_eq!((b.lon_min(), b.lon_max()), (-180.0, 180.0));
    }

    #[test]
    fn explicit_box_ending_on_seam_matches_other_spellings() {
        let negative = BoundingBox::from_explicit_bounds(0.0, 10.0, -10.0, 0.0, Unsigned).unwrap();
        let positive = BoundingBox::from_explicit_bounds(0.0, 10.0, 350.0, 360.0, Unsigned).unwrap();
        let centered = BoundingBox::from_center_and_expanse(5.0, -5.0, 10.0, 10.0, Unsigned).unwrap();
        assert_eq!((negative.lon_min(), negative.lon_max()), (350.0, 360.0));
        assert_eq!(negative, positive);
        assert_eq!(negative, centered);

        let b = BoundingBox::from_explicit_bounds(0.0, 10.0, 170.0, 180.0, Signed).unwrap();
        assert_eq!((b.lon_min(), b.lon_max()), (170.0, 180.0));
        let b = BoundingBox::from_explicit_bounds(0.0, 10.0, 0.0, 0.0, Unsigned).unwrap();
        assert_eq!((b.lon_min(), b.lon_max()), (0.0, 0.0));
    }
}
