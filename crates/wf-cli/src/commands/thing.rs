use std::path::Path;

use wf_core::ItemKey;

pub fn run(db: &Path, dimension: &str, name: &str, location: &str) -> Result<(), String> {
    let mut cache = super::open(db)?;
    let container = super::container(&mut cache, dimension, location)?;
    cache
        .add_thing(dimension, name, container.clone())
        .map_err(|e| e.to_string())?;
    super::save(&mut cache)?;

    println!("Created thing '{name}' in {container}");
    Ok(())
}

pub fn relocate(db: &Path, dimension: &str, thing: &str, target: &str) -> Result<(), String> {
    let mut cache = super::open(db)?;
    let container = super::container(&mut cache, dimension, target)?;
    cache
        .move_thing(&ItemKey::new(dimension, thing), container.clone())
        .map_err(|e| e.to_string())?;
    super::save(&mut cache)?;

    println!("Moved '{thing}' into {container}");
    Ok(())
}
