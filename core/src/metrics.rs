use prometheus::{IntCounterVec, Opts, Registry};

/// Counters for the prediction pipeline, registered on an owned registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    weather_fetch: IntCounterVec,
    prediction: IntCounterVec,
    guide_generated: IntCounterVec,
    guide_persist: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let weather_fetch = IntCounterVec::new(
            Opts::new("weather_fetch_total", "Weather lookups by outcome"),
            &["outcome"],
        )?;
        let prediction = IntCounterVec::new(
            Opts::new("prediction_total", "Crop predictions by outcome"),
            &["outcome"],
        )?;
        let guide_generated = IntCounterVec::new(
            Opts::new("guide_generated_total", "Growing guides by kind (parsed|fallback)"),
            &["kind"],
        )?;
        let guide_persist = IntCounterVec::new(
            Opts::new("guide_persist_total", "Guide saves by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(weather_fetch.clone()))?;
        registry.register(Box::new(prediction.clone()))?;
        registry.register(Box::new(guide_generated.clone()))?;
        registry.register(Box::new(guide_persist.clone()))?;

        Ok(Self { registry, weather_fetch, prediction, guide_generated, guide_persist })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn weather_fetch(&self, ok: bool) {
        self.weather_fetch.with_label_values(&[outcome(ok)]).inc();
    }

    pub fn prediction(&self, ok: bool) {
        self.prediction.with_label_values(&[outcome(ok)]).inc();
    }

    pub fn guide_generated(&self, fallback: bool) {
        let kind = if fallback { "fallback" } else { "parsed" };
        self.guide_generated.with_label_values(&[kind]).inc();
    }

    pub fn guide_persist(&self, ok: bool) {
        self.guide_persist.with_label_values(&[outcome(ok)]).inc();
    }

    pub fn weather_fetch_count(&self, ok: bool) -> u64 {
        self.weather_fetch.with_label_values(&[outcome(ok)]).get()
    }

    pub fn prediction_count(&self, ok: bool) -> u64 {
        self.prediction.with_label_values(&[outcome(ok)]).get()
    }

    pub fn guide_generated_count(&self, fallback: bool) -> u64 {
        let kind = if fallback { "fallback" } else { "parsed" };
        self.guide_generated.with_label_values(&[kind]).get()
    }

    pub fn guide_persist_count(&self, ok: bool) -> u64 {
        self.guide_persist.with_label_values(&[outcome(ok)]).get()
    }
}

fn outcome(ok: bool) -> &'static str {
    if ok { "ok" } else { "error" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_per_registry() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.weather_fetch(true);
        a.weather_fetch(false);
        a.weather_fetch(false);
        assert_eq!(a.weather_fetch_count(true), 1);
        assert_eq!(a.weather_fetch_count(false), 2);
        assert_eq!(b.weather_fetch_count(false), 0);
        assert!(!a.registry().gather().is_empty());
    }
}
