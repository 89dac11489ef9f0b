use setlist_core::overload::format_weight;
use setlist_core::store::read_targets;
use setlist_core::*;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "setlist")]
#[command(about = "Superset workout session runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the set order and rest points for a plan
    Plan {
        /// Plan file (TOML); uses the built-in plan if omitted
        #[arg(long)]
        plan: Option<PathBuf>,
    },

    /// Run a workout session (default)
    Start {
        /// Plan file (TOML); uses the built-in plan if omitted
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Auto-complete (for testing) - record every set without prompting
        #[arg(long)]
        auto_complete: bool,

        /// Weight recorded for every set when auto-completing
        #[arg(long, default_value_t = 0.0)]
        weight: f64,

        /// Reps recorded for every set when auto-completing
        #[arg(long, default_value_t = 0)]
        reps: u32,

        /// End the session early after this many sets (at least 1)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        partial_after: Option<u32>,

        /// Skip the warm-up phase
        #[arg(long)]
        skip_warmup: bool,

        /// Skip the cool-down phase
        #[arg(long)]
        skip_cooldown: bool,
    },

    /// Show stored targets for a plan's exercises
    Targets {
        #[arg(long)]
        plan: Option<PathBuf>,
    },

    /// List past sessions, or the last performance of one exercise
    History {
        #[arg(long)]
        exercise: Option<String>,
    },

    /// Export history to CSV
    Export {
        #[arg(long)]
        out: PathBuf,
    },
}

/// How the driver feeds the session
struct RunOptions {
    auto_complete: bool,
    weight: f64,
    reps: u32,
    partial_after: Option<u32>,
    skip_warmup: bool,
    skip_cooldown: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    setlist_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Some(Commands::Plan { plan }) => cmd_plan(plan.as_deref(), &config),
        Some(Commands::Start {
            plan,
            auto_complete,
            weight,
            reps,
            partial_after,
            skip_warmup,
            skip_cooldown,
        }) => cmd_start(
            &data_dir,
            plan.as_deref(),
            RunOptions {
                auto_complete,
                weight,
                reps,
                partial_after,
                skip_warmup,
                skip_cooldown,
            },
            &config,
        ),
        Some(Commands::Targets { plan }) => cmd_targets(&data_dir, plan.as_deref()),
        Some(Commands::History { exercise }) => cmd_history(&data_dir, exercise),
        Some(Commands::Export { out }) => cmd_export(&data_dir, &out),
        None => {
            // Default to an interactive session with the built-in plan
            let options = RunOptions {
                auto_complete: false,
                weight: 0.0,
                reps: 0,
                partial_after: None,
                skip_warmup: false,
                skip_cooldown: false,
            };
            cmd_start(&data_dir, None, options, &config)
        }
    }
}

fn load_plan(path: Option<&Path>) -> Result<Plan> {
    match path {
        Some(path) => Plan::load_from(path),
        None => Ok(default_plan().clone()),
    }
}

fn cmd_plan(plan_path: Option<&Path>, config: &Config) -> Result<()> {
    let plan = load_plan(plan_path)?;
    let sets = plan.sets_per_superset_or(config.session.sets_per_superset);
    let steps = build_sequence(&plan.exercises, &plan.supersets, sets);
    let rest = rest_indices_for_steps(&steps);

    println!("{} steps", steps.len());
    let mut group = None;
    for (i, step) in steps.iter().enumerate() {
        if group != Some(step.group) {
            group = Some(step.group);
            let label = if step.group_size > 1 { "Superset" } else { "Exercise" };
            println!("\n{} {}", label, step.group + 1);
        }
        let marker = if rest.contains(&i) { "  → rest" } else { "" };
        println!(
            "  {:>3}. {} set {}/{}{}",
            i + 1,
            step.exercise.name,
            step.set_number,
            step.total_sets,
            marker
        );
    }

    Ok(())
}

fn cmd_start(data_dir: &Path, plan_path: Option<&Path>, options: RunOptions, config: &Config) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;

    let plan = load_plan(plan_path)?;
    let store = FileStore::new(data_dir);
    let history = store.history().unwrap_or_else(|e| {
        tracing::warn!("Failed to read history: {}", e);
        Vec::new()
    });

    let mut session = WorkoutSession::new(&plan, &config.session, store);
    let mut clock = ElapsedClock::start();
    let mut rest = RestTimer::new();

    // Warm-up
    if session.phase() == Phase::Warmup {
        println!("\n── Warm-up ──");
        let skip = options.skip_warmup
            || (!options.auto_complete && prompt_phase("warm-up")? == PhaseAction::Skip);
        if skip {
            session.skip_warmup()?;
            println!("Warm-up skipped");
        } else {
            session.complete_warmup()?;
            println!("Warm-up done");
        }
        session.tick(clock.take_ticks());
    }

    // Exercises
    while let Some(step) = session.current_step().cloned() {
        if options
            .partial_after
            .is_some_and(|n| session.records().len() >= n as usize)
        {
            finish_early(&mut session)?;
            break;
        }

        display_step(&session, &step, &history);

        let outcome = if options.auto_complete {
            session.record_set(options.weight, options.reps)?
        } else {
            match prompt_set()? {
                SetInput::Record(weight, reps) => session.record_raw(&weight, &reps)?,
                SetInput::Back => {
                    if !session.go_back() {
                        println!("Already at the first set");
                    }
                    continue;
                }
                SetInput::ExtraSet => {
                    let added = session.add_extra_set()?;
                    println!("Added set {} of {}", added.set_number, added.exercise.name);
                    continue;
                }
                SetInput::Partial => {
                    if session.records().is_empty() {
                        println!("Record at least one set before finishing early");
                        continue;
                    }
                    finish_early(&mut session)?;
                    break;
                }
                SetInput::Quit => {
                    session.abandon();
                    println!("\nSession discarded");
                    return Ok(());
                }
            }
        };
        session.tick(clock.take_ticks());

        if let Some(ref suggestion) = outcome.suggestion {
            println!("  {}", suggestion.message);
        }
        print_target_updates(&outcome.target_updates);

        if outcome.start_rest {
            run_rest(&mut rest, config.session.rest_seconds, options.auto_complete)?;
            session.tick(clock.take_ticks());
        }
    }

    // Cool-down
    if session.phase() == Phase::Cooldown {
        println!("\n── Cool-down ──");
        let skip = options.skip_cooldown
            || (!options.auto_complete && prompt_phase("cool-down")? == PhaseAction::Skip);
        session.tick(clock.take_ticks());
        if skip {
            session.skip_cooldown()?;
            println!("Cool-down skipped");
        } else {
            session.complete_cooldown()?;
            println!("Cool-down done");
        }
    }

    let summary = session.finalize(chrono::Utc::now())?;
    display_summary(&summary);
    Ok(())
}

fn finish_early(session: &mut WorkoutSession<FileStore>) -> Result<()> {
    let updates = session.partial_complete()?;
    println!("\nFinishing early after {} sets", session.records().len());
    print_target_updates(&updates);
    Ok(())
}

fn display_step(session: &WorkoutSession<FileStore>, step: &SequenceStep, history: &[SessionSummary]) {
    let name = &step.exercise.name;
    println!(
        "\nSet {}/{}: {} ({})",
        step.set_number, step.total_sets, name, step.exercise.equipment
    );

    let targets = session.targets_for(name);
    if let (Some(weight), Some(reps)) = (targets.weight, targets.target_reps) {
        println!("  Target: {} x {}", format_weight(weight), reps);
    }

    if let Some(last) = last_performance(history, name) {
        println!(
            "  Last time: {} x {} ({})",
            format_weight(last.best_set.weight),
            last.best_set.reps,
            last.date.format("%Y-%m-%d")
        );
    }
}

fn print_target_updates(updates: &[TargetUpdate]) {
    for update in updates {
        if let Some(reps) = update.target_reps {
            println!("✓ Target reps for {} → {}", update.exercise, reps);
        }
        if let Some(weight) = update.weight {
            println!("✓ Target weight for {} → {}", update.exercise, format_weight(weight));
        }
    }
}

fn run_rest(rest: &mut RestTimer, seconds: u64, auto_complete: bool) -> Result<()> {
    if seconds == 0 {
        return Ok(());
    }

    rest.start(seconds);
    println!("  Rest {}s", seconds);

    if auto_complete {
        rest.skip();
        return Ok(());
    }

    let started = std::time::Instant::now();
    print!("  Press Enter to end rest > ");
    io::stdout().flush()?;
    read_line()?;

    if !rest.tick(started.elapsed().as_secs()) && rest.is_resting() {
        println!("  Rest skipped with {}s left", rest.remaining());
        rest.skip();
    }
    Ok(())
}

fn display_summary(summary: &SessionSummary) {
    println!("\n✓ Workout saved{}", if summary.is_partial { " (partial)" } else { "" });
    println!(
        "  Duration: {}m {}s",
        summary.duration_seconds / 60,
        summary.duration_seconds % 60
    );
    for (name, sets) in &summary.per_exercise {
        let line: Vec<String> = sets
            .sets
            .iter()
            .map(|s| format!("{}x{}", format_weight(s.weight), s.reps))
            .collect();
        println!("  {}: {}", name, line.join(", "));
    }
}

fn cmd_targets(data_dir: &Path, plan_path: Option<&Path>) -> Result<()> {
    let plan = load_plan(plan_path)?;
    let store = FileStore::new(data_dir);

    for name in plan.exercise_names() {
        let targets = read_targets(&store, name);
        let weight = targets
            .weight
            .map(format_weight)
            .unwrap_or_else(|| "-".into());
        let reps = targets
            .target_reps
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".into());
        println!("{}: weight {}, reps {}", name, weight, reps);
    }

    Ok(())
}

fn cmd_history(data_dir: &Path, exercise: Option<String>) -> Result<()> {
    let history = FileStore::new(data_dir).history()?;

    if let Some(name) = exercise {
        match last_performance(&history, &name) {
            Some(last) => println!(
                "Last {}: {} x {} on {}",
                name,
                format_weight(last.best_set.weight),
                last.best_set.reps,
                last.date.format("%Y-%m-%d")
            ),
            None => println!("No history for {}", name),
        }
        return Ok(());
    }

    if history.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }

    for summary in history.iter().rev() {
        let sets: usize = summary.per_exercise.values().map(|e| e.sets.len()).sum();
        println!(
            "{}  {:>3} min  {} exercises, {} sets{}",
            summary.date.format("%Y-%m-%d %H:%M"),
            summary.duration_seconds / 60,
            summary.per_exercise.len(),
            sets,
            if summary.is_partial { "  (partial)" } else { "" }
        );
    }

    Ok(())
}

fn cmd_export(data_dir: &Path, out: &Path) -> Result<()> {
    let history = FileStore::new(data_dir).history()?;
    let rows = export_csv(&history, out)?;
    println!("✓ Exported {} sets to {}", rows, out.display());
    Ok(())
}

#[derive(PartialEq)]
enum PhaseAction {
    Done,
    Skip,
}

enum SetInput {
    Record(String, String),
    Back,
    ExtraSet,
    Partial,
    Quit,
}

/// Read one line; `None` on end of input
fn read_line() -> Result<Option<String>> {
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn prompt_phase(name: &str) -> Result<PhaseAction> {
    print!("Press Enter when the {} is done, 's' + Enter to skip > ", name);
    io::stdout().flush()?;

    let action = match read_line()?.as_deref() {
        Some("s") | Some("S") => PhaseAction::Skip,
        _ => PhaseAction::Done,
    };
    Ok(action)
}

fn prompt_set() -> Result<SetInput> {
    println!("  Enter '<weight> <reps>', 'b' back, 'x' extra set, 'p' finish early, 'q' quit");
    print!("  > ");
    io::stdout().flush()?;

    let Some(line) = read_line()? else {
        return Ok(SetInput::Quit);
    };

    let input = match line.to_lowercase().as_str() {
        "b" => SetInput::Back,
        "x" => SetInput::ExtraSet,
        "p" => SetInput::Partial,
        "q" => SetInput::Quit,
        _ => {
            let mut parts = line.split_whitespace();
            let weight = parts.next().unwrap_or("").to_string();
            let reps = parts.next().unwrap_or("").to_string();
            SetInput::Record(weight, reps)
        }
    };
    Ok(input)
}
