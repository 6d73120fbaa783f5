use std::collections::BTreeMap;
use std::path::Path;

use wf_core::{AttrType, AttrValue, Constraint, Container, ItemKey, Place, Spot, WorldError};
use wf_persist::{PersistError, WorldCache};

fn key(name: &str) -> ItemKey {
    ItemKey::new("overworld", name)
}

/// Tavern -> Road -> Gate, a backpack in the tavern holding a coin.
fn build(cache: &mut WorldCache) {
    for name in ["Tavern", "Road", "Gate"] {
        cache.add_place("overworld", name, BTreeMap::new()).unwrap();
    }
    cache
        .add_portal("overworld", "door", "Tavern", "Road", 1.0)
        .unwrap();
    cache
        .add_portal("overworld", "path", "Road", "Gate", 2.5)
        .unwrap();
    cache
        .add_thing("overworld", "Backpack", Container::Place("Tavern".into()))
        .unwrap();
    cache
        .add_thing("overworld", "Coin", Container::Thing("Backpack".into()))
        .unwrap();
    cache
        .set_spot(&key("Tavern"), Some(Spot::at(3.0, 4.0)))
        .unwrap();
    cache
        .set_attribute(&key("Tavern"), "cozy", AttrValue::Bool(true))
        .unwrap();
}

fn open(path: &Path) -> WorldCache {
    WorldCache::open(path).unwrap()
}

#[test]
fn repeated_lookups_return_the_same_instance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        build(&mut cache);
        cache.save_all(true).unwrap();
    }

    let mut cache = open(&path);
    let first: *const Place = cache.get_place("overworld", "Road").unwrap();
    let second: *const Place = cache.get_place("overworld", "Road").unwrap();
    assert!(std::ptr::eq(first, second));
}

#[test]
fn world_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        cache.rename("Testland");
        build(&mut cache);
        cache.save_all(true).unwrap();
    }

    let mut cache = open(&path);
    assert_eq!(cache.world().meta.name, "Testland");

    let tavern = cache.get_place("overworld", "Tavern").unwrap();
    assert_eq!(tavern.spot(), Some(&Spot::at(3.0, 4.0)));
    assert!(!tavern.attributes().is_loaded());

    let world = cache.world();
    let out: Vec<_> = world
        .neighbors(&key("Tavern"))
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(out, vec!["door"]);
    // Reachable places come along with the first lookup.
    assert_eq!(world.portal(&key("path")).map(|p| p.weight()), Some(2.5));
    assert_eq!(
        world.thing(&key("Coin")).map(|t| t.location().clone()),
        Some(Container::Thing("Backpack".into()))
    );

    let attrs = cache.attributes(&key("Tavern")).unwrap();
    assert_eq!(attrs.get("cozy"), Some(&AttrValue::Bool(true)));
}

#[test]
fn thing_lookup_loads_its_root_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        build(&mut cache);
        cache.save_all(true).unwrap();
    }

    let mut cache = open(&path);
    let coin = cache.get_thing("overworld", "Coin").unwrap();
    assert_eq!(coin.location(), &Container::Thing("Backpack".into()));
    assert!(cache.world().place(&key("Tavern")).is_some());
    assert!(
        cache
            .world()
            .contains_transitively(&key("Tavern"), &key("Coin"))
    );
}

#[test]
fn removed_portal_is_deleted_from_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        build(&mut cache);
        cache
            .add_portal("overworld", "shortcut", "Tavern", "Gate", 9.0)
            .unwrap();
        cache.save_all(true).unwrap();

        cache.remove_portal(&key("shortcut")).unwrap();
        cache.save_place(&key("Tavern"), true).unwrap();
    }

    let mut cache = open(&path);
    cache.get_place("overworld", "Tavern").unwrap();
    assert_eq!(cache.world().neighbors(&key("Tavern")).len(), 1);
    assert!(cache.world().portal(&key("shortcut")).is_none());
}

#[test]
fn uncommitted_saves_are_lost_on_close() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        build(&mut cache);
        cache.save_all(true).unwrap();

        cache
            .add_place("overworld", "Cellar", BTreeMap::new())
            .unwrap();
        cache.save_place(&key("Cellar"), false).unwrap();
        cache
            .add_place("overworld", "Attic", BTreeMap::new())
            .unwrap();
        cache.save_place(&key("Attic"), false).unwrap();
        assert!(cache.in_transaction());
    }

    let mut cache = open(&path);
    assert!(matches!(
        cache.get_place("overworld", "Cellar"),
        Err(PersistError::NotFound(_))
    ));
    assert!(cache.get_place("overworld", "Tavern").is_ok());
}

#[test]
fn batched_saves_commit_together() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        build(&mut cache);
        cache.save_all(false).unwrap();
        cache.commit().unwrap();
    }

    let mut cache = open(&path);
    assert!(cache.get_place("overworld", "Gate").is_ok());
}

#[test]
fn declarations_persist_and_are_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        build(&mut cache);
        cache.declare_attribute(
            "stickiness",
            Constraint::new()
                .of_type(AttrType::Int)
                .between(-10.0, 10.0)
                .permit("unknown"),
        );
        cache.save_all(true).unwrap();
    }

    let mut cache = open(&path);
    let err = cache
        .set_attribute(&key("Coin"), "stickiness", AttrValue::Int(15))
        .unwrap_err();
    assert!(matches!(
        err,
        PersistError::World(WorldError::ConstraintViolation { .. })
    ));
    cache
        .set_attribute(&key("Coin"), "stickiness", AttrValue::from("unknown"))
        .unwrap();
    cache.save_all(true).unwrap();
    drop(cache);

    let mut cache = open(&path);
    let attrs = cache.attributes(&key("Coin")).unwrap();
    assert_eq!(attrs.get("stickiness"), Some(&AttrValue::from("unknown")));
}

#[test]
fn moving_a_thing_replaces_its_containment_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        build(&mut cache);
        cache.save_all(true).unwrap();
        cache
            .move_thing(&key("Backpack"), Container::Place("Gate".into()))
            .unwrap();
        cache.save_all(true).unwrap();
    }

    let mut cache = open(&path);
    let backpack = cache.get_thing("overworld", "Backpack").unwrap();
    assert_eq!(backpack.location(), &Container::Place("Gate".into()));
    cache.get_place("overworld", "Tavern").unwrap();
    assert!(
        cache
            .world()
            .contents("overworld", &Container::Place("Tavern".into()))
            .is_empty()
    );
}

#[test]
fn removed_place_stays_removed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        build(&mut cache);
        cache.save_all(true).unwrap();
        cache.remove_place(&key("Gate")).unwrap();
        cache.save_all(true).unwrap();
    }

    let mut cache = open(&path);
    assert!(cache.get_place("overworld", "Gate").is_err());
    cache.get_place("overworld", "Road").unwrap();
    assert!(cache.world().neighbors(&key("Road")).is_empty());
}

#[test]
fn unset_attribute_reaches_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        build(&mut cache);
        cache.save_all(true).unwrap();
    }
    {
        let mut cache = open(&path);
        let previous = cache.unset_attribute(&key("Tavern"), "cozy").unwrap();
        assert_eq!(previous, Some(AttrValue::Bool(true)));
        cache.save_all(true).unwrap();
    }

    let mut cache = open(&path);
    assert!(cache.attributes(&key("Tavern")).unwrap().is_empty());
}

#[test]
fn containment_cycle_is_rejected_through_the_cache() {
    let mut cache = WorldCache::open_in_memory().unwrap();
    build(&mut cache);
    let err = cache
        .move_thing(&key("Backpack"), Container::Thing("Coin".into()))
        .unwrap_err();
    assert!(matches!(
        err,
        PersistError::World(WorldError::ContainmentCycle { .. })
    ));
}

#[test]
fn load_dimension_brings_in_unreachable_places() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        build(&mut cache);
        cache.save_all(true).unwrap();
    }

    let mut cache = open(&path);
    cache.get_place("overworld", "Gate").unwrap();
    assert!(cache.world().place(&key("Tavern")).is_none());

    assert_eq!(cache.load_dimension("overworld").unwrap(), 3);
    assert!(cache.world().place(&key("Tavern")).is_some());
    assert_eq!(cache.world().incoming(&key("Gate")).len(), 1);
    assert_eq!(cache.load_dimension("nowhere").unwrap(), 0);
}

#[test]
fn forgotten_thing_is_read_again() {
    let mut cache = WorldCache::open_in_memory().unwrap();
    build(&mut cache);
    cache.save_all(true).unwrap();

    assert!(cache.forget(&key("Coin")));
    assert!(cache.world().thing(&key("Coin")).is_none());
    let coin = cache.get_thing("overworld", "Coin").unwrap();
    assert_eq!(coin.location(), &Container::Thing("Backpack".into()));

    // Forgetting the backpack takes the coin with it; both come back.
    assert!(cache.forget(&key("Backpack")));
    cache.get_thing("overworld", "Coin").unwrap();
    assert!(cache.world().thing(&key("Backpack")).is_some());
    assert!(
        cache
            .world()
            .contains_transitively(&key("Tavern"), &key("Coin"))
    );
}

#[test]
fn load_dimension_restores_forgotten_things() {
    let mut cache = WorldCache::open_in_memory().unwrap();
    build(&mut cache);
    cache.save_all(true).unwrap();

    cache.forget(&key("Backpack"));
    assert_eq!(cache.load_dimension("overworld").unwrap(), 3);
    assert!(cache.world().thing(&key("Backpack")).is_some());
    assert!(cache.world().thing(&key("Coin")).is_some());
}

#[test]
fn removed_portal_name_is_free_before_saving() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let mut cache = open(&path);
        build(&mut cache);
        cache.save_all(true).unwrap();

        cache.remove_portal(&key("door")).unwrap();
        cache
            .add_portal("overworld", "door", "Tavern", "Gate", 4.0)
            .unwrap();
        cache.save_all(true).unwrap();
    }

    let mut cache = open(&path);
    cache.get_place("overworld", "Tavern").unwrap();
    let door = cache.world().portal(&key("door")).unwrap();
    assert_eq!(door.destination(), "Gate");
    assert_eq!(cache.world().neighbors(&key("Tavern")).len(), 1);
}

#[test]
fn portals_of_a_removed_place_free_their_names() {
    let mut cache = WorldCache::open_in_memory().unwrap();
    build(&mut cache);
    cache.save_all(true).unwrap();

    cache.remove_place(&key("Gate")).unwrap();
    cache
        .add_portal("overworld", "path", "Road", "Tavern", 1.0)
        .unwrap();
    cache.save_all(true).unwrap();

    cache.forget(&key("Road"));
    cache.forget(&key("Tavern"));
    cache.get_place("overworld", "Road").unwrap();
    let path = cache.world().portal(&key("path")).unwrap();
    assert_eq!(path.origin(), "Road");
    assert_eq!(path.destination(), "Tavern");
}

#[test]
fn stored_portal_name_stays_taken() {
    let mut cache = WorldCache::open_in_memory().unwrap();
    build(&mut cache);
    cache.save_all(true).unwrap();

    cache.forget(&key("Tavern"));
    let err = cache
        .add_portal("overworld", "door", "Gate", "Road", 1.0)
        .unwrap_err();
    assert!(matches!(
        err,
        PersistError::World(WorldError::DuplicateKey(_))
    ));
}
