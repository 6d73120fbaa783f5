use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use wf_core::{Container, ItemKey};
use wf_persist::{PersistError, WorldCache};

pub fn run(db: &Path, dimension: &str, name: &str) -> Result<(), String> {
    let mut cache = super::open(db)?;
    let key = ItemKey::new(dimension, name);

    match cache.get_place(dimension, name) {
        Ok(_) => show_place(&mut cache, &key),
        Err(PersistError::NotFound(_)) => match cache.get_thing(dimension, name) {
            Ok(_) => show_thing(&mut cache, &key),
            Err(PersistError::NotFound(_)) => Err(format!("item not found: {key}")),
            Err(e) => Err(e.to_string()),
        },
        Err(e) => Err(e.to_string()),
    }
}

fn show_place(cache: &mut WorldCache, key: &ItemKey) -> Result<(), String> {
    // Incoming portals are only known once their origins are resident.
    cache
        .load_dimension(&key.dimension)
        .map_err(|e| e.to_string())?;
    let attributes = attribute_lines(cache, key)?;
    let world = cache.world();
    let place = world
        .place(key)
        .ok_or_else(|| format!("item not found: {key}"))?;

    println!("  {} [{}]", place.name().bold(), format!("place in {}", key.dimension).dimmed());
    if let Some(spot) = place.spot() {
        println!("  spot:     ({}, {}) on {}", spot.x, spot.y, spot.spotgraph);
    }
    println!();

    let outgoing = world.neighbors(key);
    if outgoing.is_empty() {
        println!("  {} (none)", "Portals:".dimmed());
    } else {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Portal", "To", "Weight", "Passable"]);
        for portal in &outgoing {
            table.add_row(vec![
                portal.name().to_string(),
                portal.destination().to_string(),
                portal.weight().to_string(),
                if portal.is_passable() { "yes" } else { "no" }.to_string(),
            ]);
        }
        println!("{table}");
    }

    let incoming: Vec<&str> = world.incoming(key).into_iter().map(|p| p.origin()).collect();
    if !incoming.is_empty() {
        println!("  from:     {}", incoming.join(", "));
    }
    print_contents(cache, key, Container::Place(key.name.clone()));
    print_attributes(&attributes);
    Ok(())
}

fn show_thing(cache: &mut WorldCache, key: &ItemKey) -> Result<(), String> {
    let attributes = attribute_lines(cache, key)?;
    let thing = cache
        .world()
        .thing(key)
        .ok_or_else(|| format!("item not found: {key}"))?;

    println!("  {} [{}]", thing.name().bold(), format!("thing in {}", key.dimension).dimmed());
    println!("  in:       {}", thing.location());
    print_contents(cache, key, Container::Thing(key.name.clone()));
    print_attributes(&attributes);
    Ok(())
}

fn print_contents(cache: &WorldCache, key: &ItemKey, container: Container) {
    let contents: Vec<&str> = cache
        .world()
        .contents(&key.dimension, &container)
        .into_iter()
        .map(|t| t.name())
        .collect();
    if !contents.is_empty() {
        println!("  contents: {}", contents.join(", "));
    }
}

fn attribute_lines(cache: &mut WorldCache, key: &ItemKey) -> Result<Vec<String>, String> {
    let attributes = cache.attributes(key).map_err(|e| e.to_string())?;
    Ok(attributes
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect())
}

fn print_attributes(lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    println!();
    for line in lines {
        println!("  {line}");
    }
}
