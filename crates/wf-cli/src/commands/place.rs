use std::collections::BTreeMap;
use std::path::Path;

use wf_core::{ItemKey, Portal, Spot};

pub fn run(db: &Path, dimension: &str, name: &str, spot: Option<&str>) -> Result<(), String> {
    let spot = spot.map(parse_spot).transpose()?;
    let mut cache = super::open(db)?;

    let key = cache
        .add_place(dimension, name, BTreeMap::new())
        .map_err(|e| e.to_string())?;
    if let Some(spot) = spot {
        cache.set_spot(&key, Some(spot)).map_err(|e| e.to_string())?;
    }
    super::save(&mut cache)?;

    println!("Created place '{name}' in {dimension}");
    Ok(())
}

pub fn portal(
    db: &Path,
    dimension: &str,
    from: &str,
    to: &str,
    weight: f64,
    name: Option<&str>,
) -> Result<(), String> {
    let name = name.map_or_else(|| Portal::default_name(from, to), str::to_string);
    let mut cache = super::open(db)?;

    for place in [from, to] {
        if cache.get_place(dimension, place).is_err() {
            return Err(format!("place not found: {}", ItemKey::new(dimension, place)));
        }
    }
    cache
        .add_portal(dimension, &name, from, to, weight)
        .map_err(|e| e.to_string())?;
    super::save(&mut cache)?;

    println!("Created portal '{name}' ({from} -> {to}, weight {weight})");
    Ok(())
}

/// Parse `x,y` into a spot on the default board.
fn parse_spot(s: &str) -> Result<Spot, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("invalid spot \"{s}\": expected x,y"))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid spot \"{s}\": {v} is not a number"))
    };
    Ok(Spot::at(coord(x)?, coord(y)?))
}
