use std::path::Path;

pub fn run(db: &Path, name: &str) -> Result<(), String> {
    let mut cache = super::open(db)?;
    cache.rename(name);
    super::save(&mut cache)?;

    println!("Created world '{}' in {}", name, db.display());
    println!();
    println!("Get started:");
    println!("  wf dimension <name>                 # Create a dimension");
    println!("  wf place <dimension> <name>         # Add places");
    println!("  wf portal <dimension> <from> <to>   # Connect them");
    println!("  wf show <dimension> <name>          # Inspect a place or thing");

    Ok(())
}

pub fn dimension(db: &Path, name: &str) -> Result<(), String> {
    let mut cache = super::open(db)?;
    if cache.world().dimension(name).is_some() {
        return Err(format!("dimension '{name}' already exists"));
    }
    cache.add_dimension(name);
    super::save(&mut cache)?;
    println!("Created dimension '{name}'");
    Ok(())
}
