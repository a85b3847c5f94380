use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The seven numeric features plus location, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoilField {
    N,
    P,
    K,
    Temperature,
    Humidity,
    Ph,
    Rainfall,
    Location,
}

impl SoilField {
    pub const ALL: [SoilField; 8] = [
        SoilField::N,
        SoilField::P,
        SoilField::K,
        SoilField::Temperature,
        SoilField::Humidity,
        SoilField::Ph,
        SoilField::Rainfall,
        SoilField::Location,
    ];

    /// Key used in the prediction request body.
    pub fn wire_name(self) -> &'static str {
        match self {
            SoilField::N => "N",
            SoilField::P => "P",
            SoilField::K => "K",
            SoilField::Temperature => "temperature",
            SoilField::Humidity => "humidity",
            SoilField::Ph => "ph",
            SoilField::Rainfall => "rainfall",
            SoilField::Location => "location",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SoilField::N => "Nitrogen",
            SoilField::P => "Phosphorus",
            SoilField::K => "Potassium",
            SoilField::Temperature => "Temperature",
            SoilField::Humidity => "Humidity",
            SoilField::Ph => "pH",
            SoilField::Rainfall => "Rainfall",
            SoilField::Location => "Location",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<SoilField> {
        SoilField::ALL
            .iter()
            .copied()
            .find(|f| f.wire_name().eq_ignore_ascii_case(name))
    }
}

/// Validated soil and climate features submitted for prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilSample {
    #[serde(rename = "N")]
    pub n: f64,          // kg/ha
    #[serde(rename = "P")]
    pub p: f64,          // kg/ha
    #[serde(rename = "K")]
    pub k: f64,          // kg/ha
    pub temperature: f64, // °C
    pub humidity: f64,    // %
    pub ph: f64,
    pub rainfall: f64,    // mm
    pub location: String,
}

/// Raw text of each form field as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoilForm {
    #[serde(rename = "N", default)]
    pub n: String,
    #[serde(rename = "P", default)]
    pub p: String,
    #[serde(rename = "K", default)]
    pub k: String,
    #[serde(default)]
    pub temperature: String,
    #[serde(default)]
    pub humidity: String,
    #[serde(default)]
    pub ph: String,
    #[serde(default)]
    pub rainfall: String,
    #[serde(default)]
    pub location: String,
}

impl SoilForm {
    pub fn get(&self, field: SoilField) -> &str {
        match field {
            SoilField::N => &self.n,
            SoilField::P => &self.p,
            SoilField::K => &self.k,
            SoilField::Temperature => &self.temperature,
            SoilField::Humidity => &self.humidity,
            SoilField::Ph => &self.ph,
            SoilField::Rainfall => &self.rainfall,
            SoilField::Location => &self.location,
        }
    }

    pub fn set(&mut self, field: SoilField, value: impl Into<String>) {
        let slot = match field {
            SoilField::N => &mut self.n,
            SoilField::P => &mut self.p,
            SoilField::K => &mut self.k,
            SoilField::Temperature => &mut self.temperature,
            SoilField::Humidity => &mut self.humidity,
            SoilField::Ph => &mut self.ph,
            SoilField::Rainfall => &mut self.rainfall,
            SoilField::Location => &mut self.location,
        };
        *slot = value.into();
    }
}

impl From<&SoilSample> for SoilForm {
    fn from(s: &SoilSample) -> Self {
        SoilForm {
            n: s.n.to_string(),
            p: s.p.to_string(),
            k: s.k.to_string(),
            temperature: s.temperature.to_string(),
            humidity: s.humidity.to_string(),
            ph: s.ph.to_string(),
            rainfall: s.rainfall.to_string(),
            location: s.location.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, rename = "locationName", skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, location_name: None }
    }

    pub fn is_valid(&self) -> bool {
        valid_coordinates(self.latitude, self.longitude)
    }
}

pub fn valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Current conditions at a coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature: f64, // °C
    pub humidity: f64,    // %
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain_1h: Option<f64>, // mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain_3h: Option<f64>, // mm
}

/// Canonical prediction shape after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub crop: String,
    /// Percentage 0–100, one decimal.
    pub confidence_pct: Option<f64>,
    pub model_version: Option<String>,
    pub processing_time: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Kharif,
    Rabi,
    Zaid,
}

impl Season {
    /// Indian cropping season for a calendar month (1–12).
    pub fn from_month(month: u32) -> Season {
        match month {
            10..=12 | 1 | 2 => Season::Rabi,
            3..=5 => Season::Zaid,
            _ => Season::Kharif,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Kharif => "Kharif",
            Season::Rabi => "Rabi",
            Season::Zaid => "Zaid",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideSection {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowingGuide {
    pub crop_name: String,
    pub location: String,
    pub season: String,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub summary: Value,
    #[serde(default)]
    pub timeline: Value,
    pub sections: Vec<GuideSection>,
    #[serde(default)]
    pub resources: Value,
}

/// Optional farm details embedded in the guide prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmProfile {
    #[serde(default)]
    pub farm_size_acres: Option<f64>,
    #[serde(default)]
    pub soil_type: Option<String>,
    #[serde(default)]
    pub irrigation: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_uses_wire_names() {
        let s = SoilSample {
            n: 90.0,
            p: 42.0,
            k: 43.0,
            temperature: 20.88,
            humidity: 82.0,
            ph: 6.5,
            rainfall: 202.94,
            location: "Pune".into(),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["N"], 90.0);
        assert_eq!(v["P"], 42.0);
        assert_eq!(v["K"], 43.0);
        assert_eq!(v["location"], "Pune");
        assert_eq!(v.as_object().unwrap().len(), 8);
    }

    #[test]
    fn season_boundaries() {
        assert_eq!(Season::from_month(2), Season::Rabi);
        assert_eq!(Season::from_month(3), Season::Zaid);
        assert_eq!(Season::from_month(5), Season::Zaid);
        assert_eq!(Season::from_month(6), Season::Kharif);
        assert_eq!(Season::from_month(9), Season::Kharif);
        assert_eq!(Season::from_month(10), Season::Rabi);
    }

    #[test]
    fn form_set_and_get() {
        let mut form = SoilForm::default();
        form.set(SoilField::Ph, "6.5");
        assert_eq!(form.get(SoilField::Ph), "6.5");
        assert_eq!(SoilField::from_wire_name("PH"), Some(SoilField::Ph));
    }
}
