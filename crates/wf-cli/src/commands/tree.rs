use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use wf_simulation::PathBuilder;

pub fn run(db: &Path, dimension: &str, start: &str) -> Result<(), String> {
    let mut cache = super::open(db)?;
    cache.load_dimension(dimension).map_err(|e| e.to_string())?;

    let world = cache.world();
    let tree = PathBuilder::spanning_tree(world, dimension, start).map_err(|e| e.to_string())?;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Portal", "From", "To", "Weight"]);
    for key in &tree.portals {
        if let Some(portal) = world.portal(key) {
            table.add_row(vec![
                portal.name().to_string(),
                portal.origin().to_string(),
                portal.destination().to_string(),
                portal.weight().to_string(),
            ]);
        }
    }
    println!("{table}");
    println!();
    println!(
        "  {} places spanned, total weight {}",
        tree.places.len(),
        tree.total_weight
    );

    let missed: Vec<&str> = world
        .dimension(dimension)
        .map(|d| {
            d.places()
                .map(|p| p.name())
                .filter(|name| !tree.places.contains(*name))
                .collect()
        })
        .unwrap_or_default();
    if !missed.is_empty() {
        println!("  {} {}", "not reachable:".yellow(), missed.join(", "));
    }
    Ok(())
}
