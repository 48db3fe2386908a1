//! Attack engine integration tests
//!
//! End-to-end decisions over hand-built battlefields and the sample
//! scenario, plus worked cases of the selection rules.

use std::cmp::Ordering;
use std::sync::Arc;

use fire_control::battle::ai::{
    enumerate, rank_order, AmmoModeSetGenerator, AttackCategory, AttackDecision, BaselineDamagePredictor,
    BehaviorValue, BehaviorVariableName, CandidateCombination, FireControl, NoAttackReason, OrderSubtype,
};
use fire_control::battle::{load_scenario, Battlefield, Combatant, Formation, HeatState};
use fire_control::combat::{AmmoDef, FiringMode, Weapon, WeaponDef, WeaponGroup};
use fire_control::core::{EngineConfig, Position, TeamId, WeaponId};

fn two_mode_def() -> Arc<WeaponDef> {
    Arc::new(
        WeaponDef::new("AC2", 10.0, 2.0, 600.0)
            .with_mode(FiringMode::base("STD", 1))
            .with_mode(FiringMode::new("RAPID", 2).with_heat(2.0))
            .with_ammo(AmmoDef::new("BALL", 40)),
    )
}

fn candidate(damage: f32, hit: f32, heat: f32) -> CandidateCombination {
    CandidateCombination {
        heat,
        lowest_hit_chance: hit,
        ..CandidateCombination::empty(AttackCategory::Ranged).with_damage(damage)
    }
}

#[test]
fn test_three_identical_groups_enumerate_27_combinations() {
    let def = two_mode_def();
    let weapons: Vec<Weapon> = (1..=3).map(|i| Weapon::new(WeaponId(i), def.clone())).collect();
    let groups: Vec<WeaponGroup> = weapons.iter().map(WeaponGroup::new).collect();

    let sets = enumerate(groups);
    assert_eq!(sets.raw_count, 27);
    // Multisets of size 0..=3 over two modes
    assert_eq!(sets.len(), 10);
    assert!(sets.sets.last().unwrap().is_empty());
}

#[test]
fn test_min_range_group_dropped() {
    let config = EngineConfig::default();
    let predictor = BaselineDamagePredictor::default();
    let generator = AmmoModeSetGenerator::new(&config, &predictor);

    let attacker = Combatant::unit("Archer", TeamId(0), Position::default())
        .with_weapon(Arc::new(WeaponDef::new("LRM", 4.0, 8.0, 630.0).with_min_range(50.0)));
    let target = Combatant::unit("Locust", TeamId(1), Position::new(30.0, 0.0));
    let groups = fire_control::combat::condense(attacker.weapons.iter());

    let sets = generator.ranged_sets(groups, attacker.position, &target);
    assert_eq!(sets.len(), 1);
    assert!(sets.sets[0].is_empty());
}

#[test]
fn test_damage_tie_broken_by_hit_chance() {
    let b = candidate(10.0, 0.6, 5.0);
    let c = candidate(10.0, 0.5, 5.0);
    let a = candidate(10.0, 0.55, 5.0);
    assert_eq!(rank_order(&b, &c), Ordering::Less);

    let mut ranked = vec![c.clone(), a.clone(), b.clone()];
    ranked.sort_by(rank_order);
    assert_eq!(ranked, vec![b, a, c]);
}

fn opportunity_battle(designated_position: Position, opportunity_position: Position) -> (Battlefield, fire_control::core::UnitId) {
    let mut field = Battlefield::new();
    field.behavior.global.values.insert(
        BehaviorVariableName::OpportunityFireExceedsDesignatedTargetByPercentage,
        BehaviorValue::Float(10.0),
    );
    field.behavior.global.values.insert(
        BehaviorVariableName::OpportunityFireExceedsDesignatedTargetFirepowerTakeawayByPercentage,
        BehaviorValue::Float(10.0),
    );
    let attacker = field.add(
        Combatant::unit("Marauder", TeamId(0), Position::default())
            .with_weapon(Arc::new(WeaponDef::laser("ML")))
            .with_weapon(Arc::new(WeaponDef::new("PPC", 40.0, 15.0, 540.0))),
    );
    let designated = field.add(
        Combatant::unit("Designated", TeamId(1), designated_position).with_weapon(Arc::new(WeaponDef::laser("ML"))),
    );
    field.add(
        Combatant::unit("Opportunity", TeamId(1), opportunity_position).with_weapon(Arc::new(WeaponDef::laser("ML"))),
    );
    let mut formation = Formation::new(TeamId(0));
    formation.members.push(attacker);
    formation.designated_target = Some(designated);
    field.add_formation(formation);
    (field, attacker)
}

#[test]
fn test_designated_target_holds_against_equal_opportunity() {
    // Identical targets at identical range: the designated bonus wins
    let (field, attacker) = opportunity_battle(Position::new(200.0, 0.0), Position::new(0.0, 200.0));
    let control = FireControl::new(EngineConfig::default());

    let decision = control.decide(&field, attacker, true, 1);
    assert_eq!(decision.order().unwrap().target_name, "Designated");
}

#[test]
fn test_much_closer_opportunity_target_wins() {
    // The designated target is only reachable by the PPC
    let (field, attacker) = opportunity_battle(Position::new(500.0, 0.0), Position::new(0.0, 100.0));
    let control = FireControl::new(EngineConfig::default());

    let decision = control.decide(&field, attacker, true, 1);
    let order = decision.order().unwrap();
    assert_eq!(order.target_name, "Opportunity");
    assert_eq!(order.weapons.len(), 2);
}

#[test]
fn test_heat_ceiling_limits_volley() {
    let mut field = Battlefield::new();
    let attacker = field.add(
        Combatant::unit("Awesome", TeamId(0), Position::default())
            .with_weapon(Arc::new(WeaponDef::new("PPC", 40.0, 15.0, 540.0)))
            .with_weapon(Arc::new(WeaponDef::laser("ML")))
            .with_heat(HeatState {
                current: 30.0,
                temp: 0.0,
                heatsink_capacity: 0.0,
                acceptable: 50.0,
            }),
    );
    field.add(Combatant::unit("Wasp", TeamId(1), Position::new(150.0, 0.0)));

    let control = FireControl::new(EngineConfig::default());
    let order = control.decide(&field, attacker, true, 0).order().cloned().unwrap();
    // PPC + ML is 25 heat on top of 30; the PPC alone fits
    assert_eq!(order.weapons.len(), 1);
    assert_eq!(order.weapons[0].name, "PPC");
    assert!(order.heat + 30.0 <= 50.0);
}

#[test]
fn test_acceptable_heat_multiplier_only_raises_ceiling() {
    let mut field = Battlefield::new();
    let mut unit = Combatant::unit("Awesome", TeamId(0), Position::default())
        .with_weapon(Arc::new(WeaponDef::new("PPC", 40.0, 15.0, 540.0)))
        .with_weapon(Arc::new(WeaponDef::laser("ML")))
        .with_heat(HeatState {
            current: 30.0,
            temp: 0.0,
            heatsink_capacity: 0.0,
            acceptable: 50.0,
        });
    unit.behavior = fire_control::battle::ai::BehaviorScope::new()
        .with(BehaviorVariableName::AcceptableHeatLevel, BehaviorValue::Float(1.2));
    let attacker = field.add(unit);
    field.add(Combatant::unit("Wasp", TeamId(1), Position::new(150.0, 0.0)));
    let control = FireControl::new(EngineConfig::default());

    // Ceiling 60 admits the full 25-heat volley
    let order = control.decide(&field, attacker, true, 0).order().cloned().unwrap();
    assert_eq!(order.weapons.len(), 2);

    // A multiplier below one leaves the ceiling at 50
    field.combatants[0].behavior = fire_control::battle::ai::BehaviorScope::new()
        .with(BehaviorVariableName::AcceptableHeatLevel, BehaviorValue::Float(0.5));
    let order = control.decide(&field, attacker, true, 0).order().cloned().unwrap();
    assert_eq!(order.weapons.len(), 1);
}

#[test]
fn test_melee_only_on_stationary_branch() {
    let mut field = Battlefield::new();
    let attacker = field.add(
        Combatant::unit("Hatchetman", TeamId(0), Position::default())
            .with_weapon(Arc::new(WeaponDef::new("AC10", 10.0, 3.0, 450.0)))
            .with_melee(60.0, 120.0),
    );
    field.add(Combatant::unit("Commando", TeamId(1), Position::new(60.0, 0.0)));
    let control = FireControl::new(EngineConfig::default());

    let stationary = control.decide(&field, attacker, true, 0);
    let order = stationary.order().unwrap();
    assert_eq!(order.category, AttackCategory::Melee);
    assert!(order.attack_from.is_some());
    // The strike itself is never listed as a fired weapon
    assert!(order.weapons.iter().all(|w| w.name != "melee"));
    assert_eq!(order.rationale, "using attack type: melee attack against: Commando");

    let moving = control.decide(&field, attacker, false, 0);
    assert_eq!(moving.order().unwrap().category, AttackCategory::Ranged);
}

#[test]
fn test_called_shot_against_shutdown_target() {
    let mut field = Battlefield::new();
    let mut unit = Combatant::unit("Griffin", TeamId(0), Position::default())
        .with_weapon(Arc::new(WeaponDef::new("PPC", 40.0, 15.0, 540.0)));
    unit.resolve = 25.0;
    let attacker = field.add(unit);
    let mut target = Combatant::unit("Panther", TeamId(1), Position::new(200.0, 0.0));
    target.shutdown = true;
    target.weakest_location = Some("left_arm".into());
    field.add(target);

    let control = FireControl::new(EngineConfig::default());
    let decision = control.decide(&field, attacker, true, 0);
    let order = decision.order().unwrap();
    assert_eq!(
        order.subtype,
        OrderSubtype::CalledShot {
            location: "left_arm".into()
        }
    );
    assert_eq!(order.rationale, "using called shot against: Panther");
}

#[test]
fn test_structures_are_targetable_but_never_meleed() {
    let mut field = Battlefield::new();
    let attacker = field.add(
        Combatant::unit("Banshee", TeamId(0), Position::default())
            .with_weapon(Arc::new(WeaponDef::laser("ML")))
            .with_melee(80.0, 200.0),
    );
    field.add(Combatant::structure("Bunker", TeamId(1), Position::new(50.0, 0.0)));
    let control = FireControl::new(EngineConfig::default());

    let order = control.decide(&field, attacker, true, 0).order().cloned().unwrap();
    assert_eq!(order.category, AttackCategory::Ranged);
    assert_eq!(order.target_name, "Bunker");
}

#[test]
fn test_sample_scenario_decides_and_commits() {
    let mut scenario = load_scenario("data/scenario.toml").unwrap();
    let attacker = scenario.attacker.unwrap();
    let config = EngineConfig::load("data/engine.toml").unwrap();
    let control = FireControl::new(config);

    let first = control.decide(&scenario.battlefield, attacker, true, 42);
    let second = control.decide(&scenario.battlefield, attacker, true, 42);
    assert_eq!(first, second);
    assert!(first.is_attack());

    let committed = control.decide_and_commit(&mut scenario.battlefield, attacker, true, 42);
    assert_eq!(committed, first);
    let unit = scenario.battlefield.get(attacker).unwrap();
    for selected in &committed.order().unwrap().weapons {
        assert_eq!(unit.weapon(selected.weapon).unwrap().current_ammo_mode(), &selected.ammo_mode);
    }

    let json = serde_json::to_string(&committed).unwrap();
    assert!(json.contains("\"decision\":\"attack\""));
}

#[test]
fn test_no_enemies_in_range_of_sight() {
    let mut field = Battlefield::new();
    let attacker = field.add(
        Combatant::unit("Vindicator", TeamId(0), Position::default()).with_weapon(Arc::new(WeaponDef::laser("ML"))),
    );
    let mut hidden = Combatant::unit("Spider", TeamId(1), Position::new(100.0, 0.0));
    hidden.concealed = true;
    field.add(hidden);

    let control = FireControl::new(EngineConfig::default());
    assert_eq!(
        control.decide(&field, attacker, true, 0),
        AttackDecision::no_attack(NoAttackReason::NoViableAttack)
    );
}
