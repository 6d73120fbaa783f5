use std::path::Path;

use wf_core::{AttrType, AttrValue, Check, Constraint, ItemKey};

pub fn declare(
    db: &Path,
    attribute: &str,
    attr_type: Option<&str>,
    min: Option<f64>,
    max: Option<f64>,
    permit: &[String],
) -> Result<(), String> {
    let constraint = build_constraint(attr_type, min, max, permit)?;
    let mut cache = super::open(db)?;
    cache.declare_attribute(attribute, constraint.clone());
    super::save(&mut cache)?;

    println!("Declared attribute '{attribute}'");
    if let Some(t) = constraint.type_tag() {
        println!("  type:      {t}");
    }
    match (constraint.lower(), constraint.upper()) {
        (None, None) => {}
        (lower, upper) => println!(
            "  range:     {} ..= {}",
            lower.map_or("*".to_string(), |n| n.to_string()),
            upper.map_or("*".to_string(), |n| n.to_string())
        ),
    }
    let permitted = constraint.permitted();
    if !permitted.is_empty() {
        let values: Vec<String> = permitted.iter().map(|v| v.to_string()).collect();
        println!("  permitted: {}", values.join(", "));
    }
    Ok(())
}

pub fn set(
    db: &Path,
    dimension: &str,
    item: &str,
    attribute: &str,
    value: &str,
) -> Result<(), String> {
    let value = AttrValue::parse_literal(value);
    let mut cache = super::open(db)?;
    let previous = cache
        .set_attribute(&ItemKey::new(dimension, item), attribute, value.clone())
        .map_err(|e| e.to_string())?;
    super::save(&mut cache)?;

    match previous {
        Some(old) => println!("{item}.{attribute} = {value} (was {old})"),
        None => println!("{item}.{attribute} = {value}"),
    }
    Ok(())
}

fn build_constraint(
    attr_type: Option<&str>,
    min: Option<f64>,
    max: Option<f64>,
    permit: &[String],
) -> Result<Constraint, String> {
    let mut constraint = Constraint::new();
    if let Some(t) = attr_type {
        constraint = constraint.of_type(t.parse::<AttrType>()?);
    }
    if let Some((lower, upper)) = min.zip(max).filter(|(lower, upper)| lower > upper) {
        return Err(format!("empty range: --min {lower} is above --max {upper}"));
    }
    if let Some(lower) = min {
        constraint = constraint.with(Check::AtLeast(lower));
    }
    if let Some(upper) = max {
        constraint = constraint.with(Check::AtMost(upper));
    }
    for value in permit {
        constraint = constraint.permit(AttrValue::parse_literal(value));
    }
    Ok(constraint)
}
