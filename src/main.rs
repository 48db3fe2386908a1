//! Fire Control - Entry Point
//!
//! Loads a scenario, decides one attack for the chosen attacker and prints
//! the decision.

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use fire_control::battle::ai::{AttackDecision, FireControl};
use fire_control::battle::load_scenario;
use fire_control::core::error::{FireControlError, Result};
use fire_control::core::EngineConfig;

/// Decide a unit's attack for one turn
#[derive(Parser, Debug)]
#[command(name = "fire-control")]
#[command(about = "Synthesize and select an attack for one unit of a battle scenario")]
struct Args {
    /// Scenario file (TOML)
    #[arg(long, default_value = "data/scenario.toml")]
    scenario: String,

    /// Engine configuration file (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<String>,

    /// Attacker name; the scenario's attacker when omitted
    #[arg(long)]
    attacker: Option<String>,

    /// Evaluate the branch where the attacker has moved this turn
    #[arg(long)]
    moving: bool,

    /// Random seed for deterministic runs
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Apply the chosen ammo-modes to the attacker's weapons
    #[arg(long)]
    commit: bool,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Serialize)]
struct DecisionReport<'a> {
    attacker: &'a str,
    seed: u64,
    #[serde(flatten)]
    decision: &'a AttackDecision,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fire_control=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.log_summary();

    let mut scenario = load_scenario(&args.scenario)?;
    let attacker = match &args.attacker {
        Some(name) => scenario
            .battlefield
            .find_by_name(name)
            .map(|c| c.id)
            .ok_or_else(|| FireControlError::UnitNotFound(name.clone()))?,
        None => scenario
            .attacker
            .ok_or_else(|| FireControlError::UnitNotFound("no attacker named".into()))?,
    };
    let attacker_name = scenario
        .battlefield
        .get(attacker)
        .map(|c| c.name.clone())
        .unwrap_or_default();

    let control = FireControl::new(config);
    let is_stationary = !args.moving;
    let decision = if args.commit {
        control.decide_and_commit(&mut scenario.battlefield, attacker, is_stationary, args.seed)
    } else {
        control.decide(&scenario.battlefield, attacker, is_stationary, args.seed)
    };

    match args.format.as_str() {
        "json" => {
            let report = DecisionReport {
                attacker: &attacker_name,
                seed: args.seed,
                decision: &decision,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => print_text(&attacker_name, &decision),
    }
    Ok(())
}

fn print_text(attacker: &str, decision: &AttackDecision) {
    match decision {
        AttackDecision::Attack(order) => {
            println!("{} {} against {}", attacker, order.category, order.target_name);
            println!("  weapons:         {}", order.weapon_list_string());
            if let Some(position) = order.attack_from {
                println!("  attack from:     {}", position);
            }
            println!("  expected damage: {:.2}", order.expected_damage);
            println!("  heat:            {:.1}", order.heat);
            println!("  lowest hit:      {:.2}", order.lowest_hit_chance);
            println!("  rationale:      {}", order.rationale);
        }
        AttackDecision::NoAttack { reason } => {
            println!("{} does not attack: {}", attacker, reason);
        }
    }
}
