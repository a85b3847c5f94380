mod common;

use std::sync::{Arc, Mutex};

use common::{CannedLlm, FailingStore, FailingWeather, RecordingPredictor};
use cropadvisor_core::error::PredictionError;
use cropadvisor_core::llm::LlmClient;
use cropadvisor_core::{
    CancelHandle, ConfiguredLocator, CropPredictor, EventBus, FormController, FormState, GeoPosition,
    GuideError, GuideGenerator, NoticeKind, Recommendation, SoilField, SoilSample, StaticWeatherProvider,
    SubmitMode, WeatherReading,
};

fn controller(predictor: Arc<dyn CropPredictor>, bus: &EventBus) -> FormController {
    FormController::new(
        Arc::new(FailingWeather),
        predictor,
        Arc::new(ConfiguredLocator::new(None, false)),
        bus.clone(),
    )
}

#[test]
fn starts_idle_and_cannot_submit_empty_form() {
    let bus = EventBus::new();
    let c = controller(RecordingPredictor::ok(common::rec("rice", None)), &bus);
    assert_eq!(c.state(), &FormState::Idle);
    assert!(!c.can_submit());
    // untouched fields show no message yet
    assert!(c.field_error(SoilField::N).is_none());
}

#[test]
fn editing_validates_in_real_time() {
    let bus = EventBus::new();
    let mut c = controller(RecordingPredictor::ok(common::rec("rice", None)), &bus);
    c.set_field(SoilField::Ph, "15");
    assert_eq!(c.state(), &FormState::Validating);
    assert!(c.field_error(SoilField::Ph).is_some());
    assert!(c.field_error(SoilField::N).is_none());

    c.fill(common::valid_form());
    assert!(c.is_valid());
    assert!(c.can_submit());
}

#[test]
fn successful_submit_reaches_result() {
    let bus = EventBus::new();
    let predictor = RecordingPredictor::ok(common::rec("rice", Some("p-1")));
    let mut c = controller(predictor.clone(), &bus);
    c.fill(common::valid_form());

    match c.submit() {
        FormState::Result(rec) => assert_eq!(rec.crop, "rice"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(c.submitted_sample(), Some(&common::sample()));
    assert_eq!(predictor.calls().len(), 1);
}

#[test]
fn invalid_submit_does_not_call_predictor() {
    let bus = EventBus::new();
    let rx = bus.subscribe();
    let predictor = RecordingPredictor::ok(common::rec("rice", None));
    let mut c = controller(predictor.clone(), &bus);
    c.set_field(SoilField::N, "90");

    assert_eq!(c.submit(), &FormState::Validating);
    assert!(predictor.calls().is_empty());
    assert!(c.field_error(SoilField::Location).is_some());
    assert_eq!(rx.try_recv().unwrap().kind, NoticeKind::Validation);
}

#[test]
fn failure_keeps_previous_result_and_is_recoverable() {
    let bus = EventBus::new();
    let rx = bus.subscribe();
    let predictor = RecordingPredictor::ok(common::rec("rice", None));
    let mut c = controller(predictor.clone(), &bus);
    c.fill(common::valid_form());
    c.submit();

    predictor.set_reply(Err(PredictionError::generic(Some(500))));
    match c.submit() {
        FormState::Error(msg) => assert_eq!(msg, PredictionError::GENERIC_MESSAGE),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(c.result().map(|r| r.crop.as_str()), Some("rice"));
    assert_eq!(rx.try_recv().unwrap().kind, NoticeKind::Network);

    predictor.set_reply(Ok(common::rec("maize", None)));
    assert!(c.can_submit());
    assert!(matches!(c.submit(), FormState::Result(r) if r.crop == "maize"));
}

#[test]
fn server_message_is_surfaced() {
    let bus = EventBus::new();
    let mut c = controller(RecordingPredictor::failing("Model not loaded"), &bus);
    c.fill(common::valid_form());
    assert_eq!(c.submit(), &FormState::Error("Model not loaded".into()));
}

#[test]
fn toggling_weather_keeps_entered_values() {
    let bus = EventBus::new();
    let mut c = controller(RecordingPredictor::ok(common::rec("rice", None)), &bus);
    c.fill(common::valid_form());
    c.set_weather_enhancement(true);
    c.set_weather_enhancement(false);
    assert_eq!(c.form(), &common::valid_form());
}

#[test]
fn weather_path_merges_live_values() {
    let bus = EventBus::new();
    let predictor = RecordingPredictor::ok(common::rec("rice", None));
    let weather = StaticWeatherProvider::new(WeatherReading {
        temperature: 31.6,
        humidity: 58.0,
        rain_1h: Some(4.2),
        rain_3h: None,
    });
    let mut c = FormController::new(
        Arc::new(weather),
        predictor.clone(),
        Arc::new(ConfiguredLocator::default()),
        bus.clone(),
    );
    c.fill(common::valid_form());
    c.set_weather_enhancement(true);
    c.set_position(GeoPosition::new(18.52, 73.85));
    c.submit();

    let sent = &predictor.calls()[0];
    assert_eq!((sent.temperature, sent.humidity, sent.rainfall), (32.0, 58.0, 4.0));
    assert!(c.weather_used().is_some());
    // form text is not overwritten by live weather
    assert_eq!(c.form().temperature, "20.88");
}

#[test]
fn weather_failure_publishes_partial_notice() {
    let bus = EventBus::new();
    let rx = bus.subscribe();
    let predictor = RecordingPredictor::ok(common::rec("rice", None));
    let mut c = controller(predictor.clone(), &bus);
    c.fill(common::valid_form());
    c.set_weather_enhancement(true);
    c.set_position(GeoPosition::new(18.52, 73.85));

    assert!(matches!(c.submit(), FormState::Result(_)));
    assert_eq!(predictor.calls(), vec![common::sample()]);
    assert_eq!(rx.try_recv().unwrap().kind, NoticeKind::PartialEnhancementFailure);
}

#[test]
fn denied_location_is_a_notice() {
    let bus = EventBus::new();
    let rx = bus.subscribe();
    let mut c = controller(RecordingPredictor::ok(common::rec("rice", None)), &bus);
    assert!(c.use_current_location().is_err());
    assert!(c.position().is_none());
    assert_eq!(rx.try_recv().unwrap().kind, NoticeKind::Location);
}

#[test]
fn located_position_fills_empty_location() {
    let bus = EventBus::new();
    let mut c = FormController::new(
        Arc::new(FailingWeather),
        RecordingPredictor::ok(common::rec("rice", None)),
        Arc::new(ConfiguredLocator::new(Some(GeoPosition::new(18.520_43, 73.856_74)), true)),
        bus,
    );
    let pos = c.use_current_location().unwrap();
    assert_eq!(pos.latitude, 18.5204);
    assert!(c.form().location.starts_with("Location ("));
}

/// Tears the view down while the request is in flight.
struct TeardownPredictor {
    handle: Mutex<Option<CancelHandle>>,
}

impl CropPredictor for TeardownPredictor {
    fn predict(&self, _sample: &SoilSample) -> Result<Recommendation, PredictionError> {
        if let Some(h) = self.handle.lock().unwrap().as_ref() {
            h.cancel();
        }
        Ok(common::rec("rice", None))
    }
}

#[test]
fn teardown_during_submit_discards_result() {
    let bus = EventBus::new();
    let predictor = Arc::new(TeardownPredictor { handle: Mutex::new(None) });
    let mut c = controller(predictor.clone(), &bus);
    *predictor.handle.lock().unwrap() = Some(c.cancel_handle());
    c.fill(common::valid_form());

    assert_eq!(c.submit(), &FormState::Submitting(SubmitMode::WithoutWeather));
    assert!(c.result().is_none());
    assert!(!c.can_submit());
}

#[test]
fn guide_needs_a_prediction() {
    let bus = EventBus::new();
    let mut c = controller(RecordingPredictor::ok(common::rec("rice", None)), &bus)
        .with_guides(GuideGenerator::new(Arc::new(CannedLlm(common::eight_section_guide_json()))));
    assert!(matches!(c.generate_guide(), Err(GuideError::NoPrediction)));
}

#[test]
fn guide_survives_persistence_failure() {
    let bus = EventBus::new();
    let rx = bus.subscribe();
    let generator = GuideGenerator::new(Arc::new(CannedLlm(common::eight_section_guide_json())))
        .with_store(Arc::new(FailingStore))
        .with_bus(bus.clone());
    let mut c = controller(RecordingPredictor::ok(common::rec("rice", Some("p-1"))), &bus).with_guides(generator);
    c.fill(common::valid_form());
    c.submit();

    let outcome = c.generate_guide().unwrap();
    assert!(!outcome.fallback);
    assert_eq!(outcome.guide.crop_name, "rice");
    assert!(outcome.persist.expect("store configured").join().unwrap().is_err());

    let kinds: Vec<NoticeKind> = rx.try_iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NoticeKind::PersistenceFailure]);
}

/// Counts completions so a test can see whether the model was asked at all.
struct CountingLlm(Mutex<usize>);

impl LlmClient for CountingLlm {
    fn complete(&self, _system: &str, _prompt: &str) -> Result<String, GuideError> {
        *self.0.lock().unwrap() += 1;
        Ok(common::eight_section_guide_json())
    }
}

#[test]
fn no_guide_after_teardown() {
    let bus = EventBus::new();
    let rx = bus.subscribe();
    let llm = Arc::new(CountingLlm(Mutex::new(0)));
    let generator = GuideGenerator::new(llm.clone())
        .with_store(Arc::new(FailingStore))
        .with_bus(bus.clone());
    let mut c = controller(RecordingPredictor::ok(common::rec("rice", Some("p-1"))), &bus).with_guides(generator);
    c.fill(common::valid_form());
    c.submit();
    c.teardown();

    assert!(matches!(c.generate_guide(), Err(GuideError::Cancelled)));
    assert_eq!(*llm.0.lock().unwrap(), 0);
    assert!(rx.try_recv().is_err());
}
