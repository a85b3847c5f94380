use serde::Serialize;

use crate::models::SoilSample;

/// Crops the recommendation model knows.
pub const SUPPORTED_CROPS: [&str; 22] = [
    "apple", "banana", "blackgram", "chickpea", "coconut", "coffee",
    "cotton", "grapes", "jute", "kidneybeans", "lentil", "maize",
    "mango", "mothbeans", "mungbean", "muskmelon", "orange", "papaya",
    "pigeonpeas", "pomegranate", "rice", "watermelon",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilAnalysis {
    pub soil_fertility: &'static str,
    pub climate_conditions: &'static str,
    pub water_requirements: &'static str,
    pub recommendations: Vec<&'static str>,
}

pub fn analyze_soil(s: &SoilSample) -> SoilAnalysis {
    let avg_nutrients = (s.n + s.p + s.k) / 3.0;
    let soil_fertility = if avg_nutrients > 100.0 {
        "Excellent"
    } else if avg_nutrients > 70.0 {
        "Good"
    } else if avg_nutrients > 40.0 {
        "Moderate"
    } else {
        "Poor"
    };

    let climate_conditions = if (20.0..=30.0).contains(&s.temperature) && (50.0..=80.0).contains(&s.humidity) {
        "Optimal"
    } else if (15.0..=35.0).contains(&s.temperature) && (40.0..=90.0).contains(&s.humidity) {
        "Good"
    } else {
        "Challenging"
    };

    let water_requirements = if s.rainfall > 100.0 {
        "Well-supplied"
    } else if s.rainfall > 50.0 {
        "Adequate"
    } else {
        "Irrigation needed"
    };

    let mut recommendations = Vec::new();
    if soil_fertility == "Poor" {
        recommendations.push("Consider organic fertilizers to improve soil health");
    }
    if s.ph < 6.0 {
        recommendations.push("Apply lime to reduce soil acidity");
    } else if s.ph > 8.0 {
        recommendations.push("Add organic matter to reduce alkalinity");
    }
    if water_requirements == "Irrigation needed" {
        recommendations.push("Install drip irrigation for water efficiency");
    }

    SoilAnalysis { soil_fertility, climate_conditions, water_requirements, recommendations }
}

/// Up to three reasons the readings suit cultivation, nutrients first.
pub fn suitability_reasons(s: &SoilSample) -> Vec<&'static str> {
    let mut reasons = Vec::new();

    if s.n > 100.0 {
        reasons.push("High nitrogen content supports leafy growth");
    } else if s.n > 50.0 {
        reasons.push("Adequate nitrogen levels for healthy growth");
    }
    if s.p > 80.0 {
        reasons.push("Excellent phosphorous for root development");
    } else if s.p > 40.0 {
        reasons.push("Good phosphorous levels for flowering");
    }
    if s.k > 100.0 {
        reasons.push("High potassium enhances disease resistance");
    } else if s.k > 50.0 {
        reasons.push("Sufficient potassium for fruit quality");
    }

    reasons.push(if s.temperature > 30.0 {
        "High temperature suitable for tropical crops"
    } else if s.temperature > 20.0 {
        "Moderate temperature ideal for temperate crops"
    } else {
        "Cool temperature good for cold-season crops"
    });

    if s.humidity > 70.0 {
        reasons.push("High humidity supports moisture-loving crops");
    } else if s.humidity > 50.0 {
        reasons.push("Moderate humidity prevents fungal diseases");
    }
    if s.rainfall > 150.0 {
        reasons.push("High rainfall perfect for water-intensive crops");
    } else if s.rainfall > 75.0 {
        reasons.push("Adequate rainfall for rain-fed cultivation");
    }

    reasons.push(if (6.0..=7.5).contains(&s.ph) {
        "Optimal soil pH for nutrient availability"
    } else if s.ph < 6.0 {
        "Acidic soil suitable for acid-tolerant varieties"
    } else {
        "Alkaline soil manageable with proper amendments"
    });

    reasons.truncate(3);
    reasons
}

/// Typical sowing/harvest window for a crop.
pub fn crop_growing_season(crop: &str) -> &'static str {
    match crop.trim().to_lowercase().as_str() {
        "rice" => "Kharif (June-October) and Rabi (November-April)",
        "wheat" => "Rabi (October-March)",
        "maize" => "Kharif (June-September) and Rabi (November-March)",
        "cotton" => "Kharif (April-December)",
        "sugarcane" => "Year-round (plant February-April)",
        "apple" => "Year-round tree, harvest Aug-Nov",
        "banana" => "Year-round, harvest every 12-15 months",
        "mango" => "Year-round tree, harvest March-July",
        "grapes" => "Year-round vine, harvest Feb-Apr & Oct-Jan",
        "orange" => "Year-round tree, harvest Nov-Feb",
        "coconut" => "Year-round tree, harvest every 45 days",
        "coffee" => "Year-round plant, harvest Oct-Feb",
        "chickpea" | "lentil" => "Rabi (October-March)",
        "kidneybeans" => "Kharif (June-September)",
        "blackgram" | "mungbean" => "Kharif (June-September) and Summer",
        "pigeonpeas" => "Kharif (June-December)",
        "mothbeans" => "Kharif (July-October)",
        "watermelon" => "Summer (February-May)",
        "muskmelon" => "Summer (January-May)",
        "papaya" => "Year-round, harvest 10-12 months after planting",
        "pomegranate" => "Year-round tree, harvest twice yearly",
        "jute" => "Kharif (April-September)",
        _ => "Season varies by region and variety",
    }
}

pub fn is_supported_crop(crop: &str) -> bool {
    let c = crop.trim().to_lowercase();
    SUPPORTED_CROPS.iter().any(|s| *s == c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: f64, p: f64, k: f64, t: f64, h: f64, ph: f64, r: f64) -> SoilSample {
        SoilSample { n, p, k, temperature: t, humidity: h, ph, rainfall: r, location: "x".into() }
    }

    #[test]
    fn poor_dry_acidic_soil() {
        let a = analyze_soil(&sample(10.0, 10.0, 10.0, 40.0, 20.0, 5.0, 20.0));
        assert_eq!(a.soil_fertility, "Poor");
        assert_eq!(a.climate_conditions, "Challenging");
        assert_eq!(a.water_requirements, "Irrigation needed");
        assert_eq!(a.recommendations.len(), 3);
    }

    #[test]
    fn reasons_capped_at_three() {
        let r = suitability_reasons(&sample(120.0, 90.0, 110.0, 25.0, 80.0, 6.5, 200.0));
        assert_eq!(r.len(), 3);
        assert_eq!(r[0], "High nitrogen content supports leafy growth");
    }

    #[test]
    fn season_lookup_is_case_insensitive() {
        assert_eq!(crop_growing_season(" Chickpea "), "Rabi (October-March)");
        assert_eq!(crop_growing_season("quinoa"), "Season varies by region and variety");
        assert!(is_supported_crop("Rice"));
        assert!(!is_supported_crop("wheat"));
    }
}
