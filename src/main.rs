//! RPS Tourney: headless driver.
//!
//! Loads configuration, initialises structured logging, and plays one or
//! more tournaments back to back with the human seat on autopilot,
//! chaining the human's points from one tournament into the next.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use rps_tourney::config::{self, AppConfig};
use rps_tourney::engine::{FinalOutcome, HandOutcome, HumanRole, Phase, Tournament};
use rps_tourney::strategy::{CpuPolicy, DecisionPolicy};
use rps_tourney::types::{CarryOver, Participant};

const BANNER: &str = r#"
 ____  ____  ____    _____
|  _ \|  _ \/ ___|  |_   _|__  _   _ _ __ _ __   ___ _   _
| |_) | |_) \___ \    | |/ _ \| | | | '__| '_ \ / _ \ | | |
|  _ <|  __/ ___) |   | | (_) | |_| | |  | | | |  __/ |_| |
|_| \_\_|   |____/    |_|\___/ \__,_|_|  |_| |_|\___|\__, |
                                                     |___/
  Declare. Throw. Wager.
  v0.1.0
"#;

/// Safety valve for an autopilot that keeps tying.
const MAX_STEPS: usize = 10_000;

fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let path = std::env::var("RPS_TOURNEY_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let (cfg, loaded) = match config::AppConfig::load(&path) {
        Ok(cfg) => (cfg, true),
        Err(e) if !std::path::Path::new(&path).exists() => {
            eprintln!("{e:#}; using defaults");
            (AppConfig::default(), false)
        }
        Err(e) => return Err(e),
    };

    init_logging(&cfg);
    if !loaded {
        warn!(path = %path, "Config file not found, using built-in defaults");
    }

    if !cfg.session.json_output {
        println!("{BANNER}");
    }
    info!(
        human = %cfg.tournament.human_name,
        entrants = cfg.tournament.cpu_count + 1,
        rounds = cfg.tournament.rounds,
        tournaments = cfg.session.tournaments,
        seed = ?cfg.tournament.seed,
        "RPS Tourney starting up"
    );

    // The human's autopilot gets its own stream so CPU decisions stay
    // reproducible under a fixed seed.
    let mut autopilot = Autopilot::new(&cfg);
    let mut carry = CarryOver {
        name: cfg.tournament.human_name.clone(),
        points: 0,
    };

    for n in 1..=cfg.session.tournaments {
        let seed = cfg.tournament.seed.map(|s| s.wrapping_add(u64::from(n)));
        let policy = CpuPolicy::new(cfg.policy.clone(), seed);

        let mut tournament = Tournament::start(cfg.clone(), &carry.name, carry.points, Box::new(policy))
            .context("Failed to start tournament")?;
        autopilot.play(&mut tournament)?;
        report(&tournament, n, cfg.session.json_output)?;

        carry = tournament
            .carry_over()
            .context("Tournament ended without a result")?;
        info!(tournament = n, name = %carry.name, points = carry.points, "Carrying points forward");
    }

    info!(name = %carry.name, points = carry.points, "Session complete");
    Ok(())
}

// ---------------------------------------------------------------------------
// Autopilot for the human seat
// ---------------------------------------------------------------------------

/// Plays the human seat with the same declaration logic the CPUs use and
/// bets half of what it holds.
struct Autopilot {
    brain: CpuPolicy,
    rng: StdRng,
}

impl Autopilot {
    fn new(cfg: &AppConfig) -> Self {
        let seed = cfg.tournament.seed.map(|s| s ^ 0x5EED);
        Self {
            brain: CpuPolicy::new(cfg.policy.clone(), seed),
            rng: match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_os_rng(),
            },
        }
    }

    fn play(&mut self, t: &mut Tournament) -> Result<()> {
        for _ in 0..MAX_STEPS {
            match t.phase().clone() {
                Phase::AwaitingDeclaration { pairing } => {
                    let me = t.human().clone();
                    let opponent = opponent_of(t, pairing.opponent_of(me.id))?;
                    let declaration = self.brain.choose_declaration(&me, &opponent);
                    let preview = t.reward_preview();
                    info!(
                        round = t.current_round(),
                        bracket = %pairing.bracket,
                        opponent = %opponent.name,
                        %declaration,
                        win_reward = preview.win,
                        lose_reward = preview.lose,
                        "Autopilot declares"
                    );
                    t.submit_declaration(declaration)?;
                }
                Phase::AwaitingHand { .. } => {
                    let hand = self.brain.choose_hand(t.human());
                    if let HandOutcome::Tie { opponent_hand, .. } = t.submit_hand(hand)? {
                        info!(%hand, %opponent_hand, "Tie, throwing again");
                    }
                }
                Phase::MatchComplete { result } => {
                    info!(
                        round = result.round,
                        won = result.won,
                        success = result.success,
                        reward = result.reward,
                        "Autopilot match done"
                    );
                    t.advance()?;
                }
                Phase::FinalBetting { finalists, role } => {
                    let stake = t.human().total_points() / 2;
                    if stake == 0 {
                        t.decline_final_bet()?;
                        continue;
                    }
                    let target = match role {
                        HumanRole::Finalist => None,
                        HumanRole::Spectator => {
                            let pick = finalists.pair()[self.rng.random_range(0..2)];
                            t.participant(pick).map(|p| p.name.clone())
                        }
                    };
                    t.submit_final_bet(stake, target.as_deref())?;
                }
                Phase::FinalHand { .. } => {
                    let hand = self.brain.choose_hand(t.human());
                    t.submit_final_hand(hand)?;
                }
                Phase::Complete { .. } => return Ok(()),
            }
        }
        anyhow::bail!("Autopilot gave up after {MAX_STEPS} steps")
    }
}

fn opponent_of(t: &Tournament, id: rps_tourney::types::ParticipantId) -> Result<Participant> {
    t.participant(id)
        .cloned()
        .with_context(|| format!("Unknown opponent {id}"))
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

fn report(t: &Tournament, n: u32, json: bool) -> Result<()> {
    let standings = t.standings();
    let outcome = match t.phase() {
        Phase::Complete { outcome } => outcome,
        other => anyhow::bail!("Cannot report while {}", other.name()),
    };

    if json {
        let doc = serde_json::json!({
            "tournament": n,
            "id": t.id(),
            "outcome": outcome,
            "standings": standings,
            "carry_over": t.carry_over(),
        });
        println!("{}", serde_json::to_string(&doc)?);
        return Ok(());
    }

    println!("== Tournament {n} ({}) ==", t.id());
    for record in t.match_log() {
        println!("  {record}");
    }
    match outcome {
        FinalOutcome::Coronation { champion, bonus } => {
            let name = t.participant(*champion).map(|p| p.name.as_str()).unwrap_or("?");
            println!("  {name} takes both titles: +{bonus}pt");
        }
        FinalOutcome::Wager(result) => {
            println!(
                "  Final: {} wins with {} over {}",
                result.winner_name, result.winning_hand, result.losing_hand
            );
            for (id, odds) in result.odds {
                let name = t.participant(id).map(|p| p.name.as_str()).unwrap_or("?");
                println!("    {name}: {odds}");
            }
            if result.stake > 0 {
                println!(
                    "  Your bet of {}pt {} (+{}pt)",
                    result.stake,
                    if result.bet_success { "paid off" } else { "was lost" },
                    result.bet_reward
                );
            }
        }
    }
    println!();
    for row in &standings {
        println!("  {row}");
    }
    println!();
    Ok(())
}

/// Initialise tracing subscriber with env filter.
fn init_logging(cfg: &AppConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rps_tourney=info"));

    let json_logging = std::env::var("RPS_TOURNEY_LOG_JSON").is_ok();

    // JSON reports go to stdout; keep logs off it.
    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else if cfg.session.json_output {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
