use std::collections::BTreeMap;

use cropadvisor_core::{load_guides, save_guides, GrowingGuide, GuideSection, GuideStore, JsonFileGuideStore, SavedGuide};
use serde_json::json;

fn guide(crop: &str) -> GrowingGuide {
    GrowingGuide {
        crop_name: crop.to_string(),
        location: "Nashik".to_string(),
        season: "Rabi".to_string(),
        generated_at: "2026-10-17T08:00:00+00:00".to_string(),
        summary: json!({ "overview": "test" }),
        timeline: json!({}),
        sections: vec![GuideSection { title: "Soil Preparation".into(), content: "Plough twice".into() }],
        resources: json!({}),
    }
}

#[test]
fn missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = load_guides(&dir.path().join("none.json")).unwrap();
    assert!(loaded.is_empty());
}

#[test]
fn save_and_load_guides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guides.json");

    let mut guides = BTreeMap::new();
    guides.insert(
        "p-1".to_string(),
        SavedGuide {
            guide_id: "g-1".into(),
            prediction_id: "p-1".into(),
            saved_at: "2026-10-17T08:00:01+00:00".into(),
            guide: guide("wheat"),
        },
    );
    save_guides(&guides, &path).unwrap();

    let loaded = load_guides(&path).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded["p-1"].guide.crop_name, "wheat");
}

#[test]
fn store_replaces_guide_for_same_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileGuideStore::new(dir.path().join("guides.json"));

    store.save_guide("p-1", &guide("wheat")).unwrap();
    store.save_guide("p-1", &guide("chickpea")).unwrap();
    store.save_guide("p-2", &guide("mustard")).unwrap();

    assert_eq!(store.guide_for_prediction("p-1").unwrap().unwrap().guide.crop_name, "chickpea");
    assert!(store.guide_for_prediction("p-9").unwrap().is_none());
    assert_eq!(load_guides(store.path()).unwrap().len(), 2);
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guides.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(load_guides(&path).is_err());
}
