//! gridmimic - scripted differential test harness entry point

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use gridmimic_cli::{
    cli::Cli,
    config::ResolvedConfig,
    error::Result,
    loopback::{LoopbackClient, LoopbackConfig},
    repl::{CommandInterpreter, ReplOutcome},
};
use gridmimic_core::{
    encounter::DEFAULT_ACTOR, BehaviorMode, EncounterLog, SessionClient, SessionController,
    SessionDirective, SessionState,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration errors are fatal before any session exists.
    let config = match ResolvedConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gridmimic: {e}");
            std::process::exit(1);
        }
    };

    setup_logging(config.verbose);

    if let Err(e) = run(config).await {
        eprintln!("gridmimic: {e}");
        std::process::exit(1);
    }
}

async fn run(config: ResolvedConfig) -> Result<()> {
    let log = Arc::new(EncounterLog::new(
        DEFAULT_ACTOR,
        config.ua_tag.clone(),
        config.encounter_log.as_deref(),
    ));

    // The loopback grid stands in for a real wire client; a production
    // client plugs in through the same SessionClient trait.
    let client = Arc::new(LoopbackClient::new(LoopbackConfig::default()));
    let controller = Arc::new(SessionController::new(
        client.clone(),
        log.clone(),
        config.mode,
        config.chatter_text.clone(),
    ));

    // Protocol events arrive on their own task, concurrently with the
    // interpreter loop below.
    let events = client.subscribe();
    let pump = tokio::spawn(controller.clone().run_event_pump(events));

    if let Some(timeout_secs) = config.timeout_secs {
        info!("run-time ceiling armed: {timeout_secs}s");
        CommandInterpreter::arm_runtime_ceiling(log.clone(), timeout_secs);
    }

    if config.auto_login {
        log.emit(
            "Login",
            "Start",
            &format!(
                "URI: {}, User: {} {}, Mode: {}",
                config.uri, config.first_name, config.last_name, config.mode
            ),
        );
        let directive = controller
            .login(
                &config.first_name,
                &config.last_name,
                &config.password,
                &config.uri,
            )
            .await?;

        if directive == SessionDirective::Terminate {
            // Ghost: vanish with the session half-open, no logout.
            std::process::exit(0);
        }

        if config.mode == BehaviorMode::Wallflower && controller.state() == SessionState::Connected
        {
            log.emit("Behavior", "Wallflower", "Waiting for server timeout...");
            tokio::time::sleep(std::time::Duration::from_secs(config.wallflower_dwell_secs))
                .await;
            pump.abort();
            return Ok(());
        }
    }

    let mut interpreter = CommandInterpreter::new(controller, log, config.uri.clone());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let outcome = interpreter.run(stdin).await?;

    if outcome == ReplOutcome::TerminateRequested {
        std::process::exit(0);
    }

    pump.abort();
    Ok(())
}

/// Harness diagnostics (not the encounter trace) go through tracing
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
