use chrono::Duration;
use clap::{ArgAction, Parser, Subcommand};
use consult_core::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "supervise")]
#[command(about = "Supervise a patient's treatment and e-prescription", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override registry data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a patient with an empty prescription for an illness
    Enroll {
        /// Patient health card ID (16 alphanumeric characters)
        #[arg(long)]
        patient: String,

        #[arg(long)]
        illness: String,

        /// Doctor membership number (defaults to the configured one)
        #[arg(long)]
        membership: Option<u32>,
    },

    /// Open an interactive consultation session
    Session {
        #[arg(long)]
        patient: String,

        #[arg(long)]
        illness: String,
    },

    /// List transmitted prescriptions
    Log,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    consult_core::logging::init(cli.verbose)?;

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using registry data dir {:?}", data_dir);

    match cli.command {
        Commands::Enroll {
            patient,
            illness,
            membership,
        } => cmd_enroll(
            data_dir,
            &patient,
            &illness,
            membership.unwrap_or(config.doctor.membership_number),
        ),
        Commands::Session { patient, illness } => {
            cmd_session(data_dir, &patient, &illness, &config)
        }
        Commands::Log => cmd_log(data_dir),
    }
}

fn cmd_enroll(data_dir: PathBuf, patient: &str, illness: &str, membership: u32) -> Result<()> {
    let patient = HealthCardId::new(patient)?;
    let mut registry = FileRegistry::new(data_dir);
    registry.enroll(&patient, membership, illness)?;

    println!("✓ Enrolled {} for '{}'", patient, illness);
    Ok(())
}

fn cmd_log(data_dir: PathBuf) -> Result<()> {
    let registry = FileRegistry::new(data_dir);
    let records = read_transmissions(&registry.transmissions_path())?;

    if records.is_empty() {
        println!("No prescriptions transmitted yet.");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {}  {}  '{}'  {} line(s)",
            record.transmitted_at.format("%Y-%m-%d %H:%M"),
            record.code,
            record.patient,
            record.illness,
            record.prescription.line_count()
        );
    }
    Ok(())
}

fn cmd_session(data_dir: PathBuf, patient: &str, illness: &str, config: &Config) -> Result<()> {
    let patient = HealthCardId::new(patient)?;
    let registry = FileRegistry::new(data_dir);
    let advisor = ScriptedAdvisor::new(&config.advisor);
    let mut terminal = ConsultationTerminal::new(registry, advisor);

    terminal.start_revision(&patient, illness)?;
    println!("Revision started for {} ({})", patient, illness);
    if let Some(history) = terminal.history() {
        if !history.history().is_empty() {
            println!("\nMedical history:\n{}", history.history());
        }
    }
    println!("Type 'help' for commands.");

    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let command = match parse_command(line.trim()) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("✗ {}", e);
                continue;
            }
        };

        if matches!(command, SessionCommand::Quit) {
            break;
        }

        // Errors never end the session; the terminal state is unchanged on failure
        if let Err(e) = run_command(&mut terminal, command) {
            println!("✗ {}", e);
        }
    }

    Ok(())
}

enum SessionCommand {
    Assess(String),
    Edit,
    Ai,
    Ask(String),
    Suggest,
    Add { product: ProductId, raw: Vec<String> },
    Dose { product: ProductId, dose: f64 },
    Remove(ProductId),
    End { days: i64 },
    Finish,
    Sign,
    Send,
    Show,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<SessionCommand>> {
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match verb.to_lowercase().as_str() {
        "assess" => SessionCommand::Assess(rest.to_string()),
        "edit" => SessionCommand::Edit,
        "ai" => SessionCommand::Ai,
        "ask" => SessionCommand::Ask(rest.to_string()),
        "suggest" => SessionCommand::Suggest,
        "add" => {
            if args.len() < 7 {
                return Err(Error::Validation(
                    "usage: add <product> <dayMoment> <duration> <dose> <freq> <unit> <instructions...>"
                        .into(),
                ));
            }
            let mut raw: Vec<String> = args[1..6].iter().map(|s| s.to_string()).collect();
            raw.push(args[6..].join(" "));
            SessionCommand::Add {
                product: ProductId::new(args[0])?,
                raw,
            }
        }
        "dose" => {
            if args.len() != 2 {
                return Err(Error::Validation("usage: dose <product> <dose>".into()));
            }
            SessionCommand::Dose {
                product: ProductId::new(args[0])?,
                dose: args[1]
                    .parse()
                    .map_err(|_| Error::Validation(format!("'{}' is not a number", args[1])))?,
            }
        }
        "remove" => {
            if args.len() != 1 {
                return Err(Error::Validation("usage: remove <product>".into()));
            }
            SessionCommand::Remove(ProductId::new(args[0])?)
        }
        "end" => {
            if args.len() != 1 {
                return Err(Error::Validation("usage: end <days from now>".into()));
            }
            SessionCommand::End {
                days: args[0]
                    .parse()
                    .map_err(|_| Error::Validation(format!("'{}' is not a day count", args[0])))?,
            }
        }
        "finish" => SessionCommand::Finish,
        "sign" => SessionCommand::Sign,
        "send" => SessionCommand::Send,
        "show" => SessionCommand::Show,
        "help" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => {
            return Err(Error::Validation(format!(
                "unknown command '{}', type 'help'",
                other
            )))
        }
    };

    Ok(Some(command))
}

fn run_command(
    terminal: &mut ConsultationTerminal<FileRegistry, ScriptedAdvisor>,
    command: SessionCommand,
) -> Result<()> {
    match command {
        SessionCommand::Assess(text) => {
            terminal.record_assessment(&text)?;
            println!("✓ Assessment added to history");
        }
        SessionCommand::Edit => {
            terminal.begin_edition()?;
            println!("✓ Prescription edition started");
        }
        SessionCommand::Ai => {
            terminal.consult_ai()?;
            println!("✓ AI ready");
        }
        SessionCommand::Ask(prompt) => {
            let answer = terminal.ask_ai(&prompt)?;
            println!("\n{}", answer.trim_end());
        }
        SessionCommand::Suggest => {
            let suggestions = terminal.extract_suggestions()?;
            if suggestions.is_empty() {
                println!("No suggestions in the last answer.");
            }
            for suggestion in &suggestions {
                display_suggestion(suggestion);
            }
        }
        SessionCommand::Add { product, raw } => {
            terminal.add_line(&product, raw.as_slice())?;
            println!("✓ Line added for {}", product);
        }
        SessionCommand::Dose { product, dose } => {
            terminal.modify_dose(&product, dose)?;
            println!("✓ Dose of {} set to {}", product, dose);
        }
        SessionCommand::Remove(product) => {
            terminal.remove_line(&product)?;
            println!("✓ Line removed for {}", product);
        }
        SessionCommand::End { days } => {
            let span = Duration::try_days(days)
                .ok_or_else(|| Error::Validation(format!("{} days is out of range", days)))?;
            let date = terminal.set_ending_date_in(span)?;
            println!("✓ Treatment ends {}", date.format("%Y-%m-%d"));
        }
        SessionCommand::Finish => {
            terminal.finish_edition()?;
            println!("✓ Prescription edition finished");
        }
        SessionCommand::Sign => {
            terminal.stamp_signature()?;
            println!("✓ Signature stamped");
        }
        SessionCommand::Send => {
            let prescription = terminal.transmit()?;
            let code = prescription
                .issued_code()
                .map(|c| c.to_string())
                .unwrap_or_default();
            println!("✓ Prescription transmitted");
            println!("  Issued code: {}", code);
        }
        SessionCommand::Show => display_session(terminal),
        SessionCommand::Help => display_help(),
        SessionCommand::Quit => {}
    }
    Ok(())
}

fn display_session(terminal: &ConsultationTerminal<FileRegistry, ScriptedAdvisor>) {
    let state = terminal.state();
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {:?}", state.phase());
    println!("╰─────────────────────────────────────────╯");
    println!(
        "  AI ready: {}  Dates set: {}  Signed: {}",
        state.is_ai_ready(),
        state.are_dates_set(),
        state.is_signature_stamped()
    );

    let Some(prescription) = terminal.prescription() else {
        return;
    };

    println!();
    println!("  Illness: {}", prescription.illness());
    if let Some(code) = prescription.issued_code() {
        println!("  Issued code: {}", code);
    }
    if let (Some(from), Some(to)) = (prescription.prescription_date(), prescription.end_date()) {
        println!("  From {} to {}", from.format("%Y-%m-%d"), to.format("%Y-%m-%d"));
    }
    println!();

    if prescription.line_count() == 0 {
        println!("  (no lines)");
    }
    for line in prescription.lines() {
        let g = &line.guideline;
        println!(
            "  → {}  dose {} x{} per {}  {}  {} days  \"{}\"",
            line.product,
            g.posology().dose(),
            g.posology().frequency(),
            g.posology().frequency_unit(),
            g.day_moment(),
            g.duration(),
            g.instructions()
        );
    }
    println!();
}

fn display_suggestion(suggestion: &Suggestion) {
    match suggestion {
        Suggestion::Insert { product, guideline } => {
            println!("  INSERT    {}  {}", product, guideline.to_raw().join(", "));
        }
        Suggestion::Modify { product, patch } => {
            let mut changes = Vec::new();
            if let Some(m) = patch.day_moment {
                changes.push(format!("moment={}", m));
            }
            if let Some(d) = patch.duration {
                changes.push(format!("duration={}", d));
            }
            if let Some(d) = patch.dose {
                changes.push(format!("dose={}", d));
            }
            if let Some(f) = patch.frequency {
                changes.push(format!("frequency={}", f));
            }
            if let Some(u) = patch.frequency_unit {
                changes.push(format!("unit={}", u));
            }
            if let Some(i) = &patch.instructions {
                changes.push(format!("instructions={}", i));
            }
            println!("  MODIFY    {}  {}", product, changes.join(", "));
        }
        Suggestion::Eliminate { product } => {
            println!("  ELIMINATE {}", product);
        }
    }
}

fn display_help() {
    println!("Commands:");
    println!("  assess <text>          add an assessment to the history");
    println!("  edit                   start editing the prescription");
    println!("  ai                     start the decision-support AI");
    println!("  ask <prompt>           ask the AI for suggestions");
    println!("  suggest                list suggestions from the last answer");
    println!("  add <product> <dayMoment> <duration> <dose> <freq> <unit> <instructions...>");
    println!("  dose <product> <dose>  change the dose of a line");
    println!("  remove <product>       remove a line");
    println!("  end <days>             set the ending date <days> from now");
    println!("  finish                 finish editing");
    println!("  sign                   stamp the signature");
    println!("  send                   transmit to the registry");
    println!("  show                   show the session");
    println!("  quit                   leave the session");
}
