use log::info;

use crate::error::GeoError;
use crate::models::GeoPosition;

/// On-demand position lookup. Only called on explicit user action.
pub trait GeoLocator: Send + Sync {
    fn locate(&self) -> Result<GeoPosition, GeoError>;
}

/// Position from configuration; sharing can be switched off like a denied permission prompt.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLocator {
    pub position: Option<GeoPosition>,
    pub sharing_allowed: bool,
}

impl ConfiguredLocator {
    pub fn new(position: Option<GeoPosition>, sharing_allowed: bool) -> Self {
        Self { position, sharing_allowed }
    }
}

impl GeoLocator for ConfiguredLocator {
    fn locate(&self) -> Result<GeoPosition, GeoError> {
        if !self.sharing_allowed {
            return Err(GeoError::PermissionDenied);
        }
        let pos = self
            .position
            .clone()
            .ok_or_else(|| GeoError::PositionUnavailable("no position configured".into()))?;
        if !pos.is_valid() {
            return Err(GeoError::PositionUnavailable(format!(
                "invalid coordinates lat={} lon={}",
                pos.latitude, pos.longitude
            )));
        }
        Ok(normalize_position(pos))
    }
}

/// Rounds to 4 decimals (~11 m) and falls back to a coordinate label when no name is known.
pub fn normalize_position(pos: GeoPosition) -> GeoPosition {
    let lat = (pos.latitude * 10_000.0).round() / 10_000.0;
    let lon = (pos.longitude * 10_000.0).round() / 10_000.0;
    let name = pos
        .location_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("Location ({:.4}, {:.4})", lat, lon));
    info!("[geo] position lat={:.4}, lon={:.4} ({})", lat, lon, name);
    GeoPosition { latitude: lat, longitude: lon, location_name: Some(name) }
}

/// User-visible text for a failed lookup.
pub fn notice_text(err: &GeoError) -> String {
    match err {
        GeoError::PermissionDenied => {
            "Location access denied. Enter your location manually.".to_string()
        }
        GeoError::PositionUnavailable(_) => {
            "Current position is unavailable. Enter your location manually.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_when_sharing_off() {
        let l = ConfiguredLocator::new(Some(GeoPosition::new(18.5, 73.8)), false);
        assert_eq!(l.locate(), Err(GeoError::PermissionDenied));
    }

    #[test]
    fn unavailable_without_position() {
        let l = ConfiguredLocator::new(None, true);
        assert!(matches!(l.locate(), Err(GeoError::PositionUnavailable(_))));
        let bad = ConfiguredLocator::new(Some(GeoPosition::new(120.0, 0.0)), true);
        assert!(matches!(bad.locate(), Err(GeoError::PositionUnavailable(_))));
    }

    #[test]
    fn normalizes_name_and_precision() {
        let l = ConfiguredLocator::new(Some(GeoPosition::new(18.520_43, 73.856_74)), true);
        let p = l.locate().unwrap();
        assert_eq!(p.latitude, 18.5204);
        assert_eq!(p.longitude, 73.8567);
        assert_eq!(p.location_name.as_deref(), Some("Location (18.5204, 73.8567)"));
    }
}
