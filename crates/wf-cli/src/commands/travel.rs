use std::path::Path;

use colored::Colorize;
use wf_core::ItemKey;
use wf_simulation::{SimConfig, SimEventKind, Simulation, TravelSystem, Whereabouts};

pub fn run(
    db: &Path,
    dimension: &str,
    thing: &str,
    to: &str,
    ticks: u64,
    speed: f64,
) -> Result<(), String> {
    let mut cache = super::open(db)?;
    let traveler = ItemKey::new(dimension, thing);
    let destination = ItemKey::new(dimension, to);
    cache
        .get_thing(dimension, thing)
        .map_err(|e| e.to_string())?;
    cache
        .get_place(dimension, to)
        .map_err(|e| e.to_string())?;

    let config = SimConfig::default()
        .with_default_speed(speed)
        .with_max_events(500);
    let mut travel = TravelSystem::from_config(&config);
    let steps = travel
        .send_to(cache.world(), &traveler, &destination)
        .map_err(|e| e.to_string())?;

    let mut sim = Simulation::new(config);
    sim.add_system(travel);
    sim.run(cache.world_mut(), dimension, ticks)
        .map_err(|e| format!("simulation error: {e}"))?;

    println!(
        "  {} of '{}' to '{}' {}",
        "Journey".bold(),
        thing,
        to,
        format!("({steps} steps, {ticks} ticks, speed {speed}/tick)").dimmed()
    );
    println!();
    for event in sim.events().events() {
        let tick_label = format!("[tick {:>3}]", event.tick).dimmed();
        let desc = colorize_event(&event.kind, &event.description);
        println!("  {tick_label} {desc}");
    }
    if sim.events().is_empty() {
        println!("  {}", "(no events)".dimmed());
    }
    println!();

    let engine = sim
        .get_system::<TravelSystem>()
        .map(TravelSystem::engine)
        .ok_or("travel system missing")?;
    match engine.whereabouts(&traveler) {
        Whereabouts::At(place) => {
            println!("  {} at {}", "Arrived".green().bold(), place.name);
        }
        Whereabouts::InTransit { portal, progress } => {
            println!(
                "  {} inside {} ({:.0}% through)",
                "Underway".yellow().bold(),
                portal.name,
                progress * 100.0
            );
        }
        _ => println!("  {} already at {}", "Stayed".bold(), to),
    }

    super::save(&mut cache)
}

fn colorize_event(kind: &SimEventKind, description: &str) -> colored::ColoredString {
    match kind {
        SimEventKind::Departed { .. } => description.blue(),
        SimEventKind::Arrived { .. } => description.green(),
        SimEventKind::Halted { .. } => description.yellow(),
    }
}
