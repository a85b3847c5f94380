use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use serde_json::json;

use cropadvisor_core::cli::{init_logging, render_analysis, render_guide, render_recommendation, Cli, Commands};
use cropadvisor_core::guide::GuideGenerator;
use cropadvisor_core::models::{GeoPosition, Season, SoilForm};
use cropadvisor_core::{validate, AdvisorConfig, EventBus, FormController, FormState, Metrics};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging("warn").map_err(|e| anyhow::anyhow!(e))?;
    let cfg = AdvisorConfig::from_env(Path::new(&cli.config))
        .with_context(|| format!("loading config {}", cli.config))?;
    let bus = EventBus::new();
    let notices = bus.subscribe();

    let outcome = run(&cli, &cfg, &bus);

    bus.shutdown();
    for n in notices.try_iter() {
        eprintln!("[{:?}] {}", n.kind, n.message);
    }
    outcome
}

fn run(cli: &Cli, cfg: &AdvisorConfig, bus: &EventBus) -> Result<()> {
    match &cli.command {
        Commands::Validate { form } => {
            let form: SoilForm = form.clone().into();
            match validate(&form) {
                Ok(sample) => {
                    if cli.json {
                        println!("{}", json!({ "valid": true, "sample": sample }));
                    } else {
                        println!("Sample is valid.\n{}", render_analysis(&sample));
                    }
                    Ok(())
                }
                Err(e) => {
                    if cli.json {
                        let fields: serde_json::Map<_, _> = e
                            .fields()
                            .iter()
                            .map(|(f, m)| (f.wire_name().to_string(), json!(m)))
                            .collect();
                        println!("{}", json!({ "valid": false, "errors": fields }));
                    } else {
                        for (f, m) in e.fields() {
                            println!("{}: {}", f.wire_name(), m);
                        }
                    }
                    bail!("sample is invalid")
                }
            }
        }
        Commands::Predict { form, weather, lat, lon, use_location, guide } => {
            let metrics = Metrics::new().context("metrics registry")?;
            let mut controller = build_controller(cfg, bus, metrics);
            controller.fill(form.clone().into());
            controller.set_weather_enhancement(*weather || cfg.weather_enhancement);
            if let (Some(lat), Some(lon)) = (lat, lon) {
                controller.set_position(GeoPosition::new(*lat, *lon));
            } else if *use_location {
                // failure is reported as a notice; submission continues without weather
                let _ = controller.use_current_location();
            }

            match controller.submit().clone() {
                FormState::Result(rec) => {
                    let sample = controller
                        .submitted_sample()
                        .cloned()
                        .context("prediction without submitted sample")?;
                    if cli.json {
                        println!(
                            "{}",
                            json!({ "recommendation": rec, "sample": sample, "weather": controller.weather_used() })
                        );
                    } else {
                        print!("{}", render_recommendation(&rec, &sample, controller.weather_used()));
                    }
                }
                FormState::Error(msg) => bail!("prediction failed: {}", msg),
                _ => bail!("sample is invalid: {:?}", controller.errors()),
            }

            if *guide {
                let outcome = controller.generate_guide()?;
                print_guide(cli.json, &outcome.guide);
                if let Some(handle) = outcome.persist {
                    // CLI process exits right after, so wait for the save here
                    let _ = handle.join();
                }
            }
            controller.teardown();
            Ok(())
        }
        Commands::Guide { crop, form, prediction_id } => {
            let form: SoilForm = form.clone().into();
            let sample = validate(&form).map_err(|e| anyhow::anyhow!("{}", e))?;
            let generator = guide_generator(cfg, bus, Metrics::new().context("metrics registry")?);
            let parsed = generator.generate(crop, &sample.location, &sample)?;
            print_guide(cli.json, &parsed.guide);
            if let Some(id) = prediction_id {
                if let Some(handle) = generator.persist_in_background(id, &parsed.guide) {
                    let _ = handle.join();
                }
            }
            Ok(())
        }
        Commands::Season { month } => {
            let month = month.unwrap_or_else(|| Local::now().month());
            let season = Season::from_month(month);
            if cli.json {
                println!("{}", json!({ "month": month, "season": season }));
            } else {
                println!("{}", season);
            }
            Ok(())
        }
    }
}

fn guide_generator(cfg: &AdvisorConfig, bus: &EventBus, metrics: Metrics) -> GuideGenerator {
    let mut g = GuideGenerator::new(cfg.llm_client())
        .with_bus(bus.clone())
        .with_metrics(metrics)
        .with_farm_profile(cfg.farm.clone());
    if let Some(store) = cfg.guide_store() {
        g = g.with_store(store);
    }
    g
}

fn build_controller(cfg: &AdvisorConfig, bus: &EventBus, metrics: Metrics) -> FormController {
    FormController::new(
        Arc::new(cfg.weather_client()),
        Arc::new(cfg.prediction_client()),
        Arc::new(cfg.locator()),
        bus.clone(),
    )
    .with_guides(guide_generator(cfg, bus, metrics.clone()))
    .with_metrics(metrics)
}

fn print_guide(as_json: bool, guide: &cropadvisor_core::GrowingGuide) {
    if as_json {
        match serde_json::to_string_pretty(guide) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("guide serialization failed: {}", e),
        }
    } else {
        print!("{}", render_guide(guide));
    }
}
