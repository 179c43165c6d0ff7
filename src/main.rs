//! Quantum: terminal forecast for a fixed location.
//!
//! Loads the forecast once at start (from cache when fresh), then keeps it
//! current on the configured interval until the user quits.

mod render;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use quantum_core::{App, AppError, AppOptions, Config};
use quantum_weather::{RefreshInterval, RefreshState};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Hourly and 7-day forecast from Open-Meteo
#[derive(Parser, Debug)]
#[command(name = "quantum", version, about = "Hourly and 7-day weather forecast")]
struct Cli {
    /// Config file (defaults to <config dir>/quantum/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Refresh interval in minutes: 15, 30, 60, 120 or 180
    #[arg(long, value_name = "MINUTES", value_parser = parse_interval)]
    refresh: Option<RefreshInterval>,

    /// Load the forecast once, print it and exit
    #[arg(long)]
    once: bool,

    /// Keep the cache in memory only
    #[arg(long)]
    no_cache: bool,
}

fn parse_interval(s: &str) -> Result<RefreshInterval, String> {
    let minutes: u32 = s
        .trim()
        .parse()
        .map_err(|_| format!("not a number of minutes: {}", s))?;
    RefreshInterval::try_from(minutes).map_err(|e| e.to_string())
}

/// A line typed on stdin while running interactively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Refresh,
    Interval(RefreshInterval),
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    match line.trim() {
        "r" | "refresh" => Ok(Command::Refresh),
        "q" | "quit" | "exit" => Ok(Command::Quit),
        other => parse_interval(other).map(Command::Interval),
    }
}

const HELP: &str = "Commands: r = update now, 15|30|60|120|180 = refresh interval, q = quit";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    quantum_core::init()?;

    let (config, _) = Config::load_validated(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let app = App::new(
        config,
        AppOptions {
            no_cache: cli.no_cache,
            refresh: cli.refresh,
        },
    )?;

    let result = if cli.once {
        run_once(&app).await
    } else {
        run_interactive(&app).await
    };

    app.shutdown();
    result
}

async fn run_once(app: &App) -> Result<(), AppError> {
    let state = app.controller().start().await;
    print_state(app, &state);
    if let RefreshState::Failed(e) = state {
        return Err(e.into());
    }
    Ok(())
}

async fn run_interactive(app: &App) -> Result<(), AppError> {
    let controller = app.controller();
    let mut states = controller.subscribe();

    let initial = controller.start().await;
    states.borrow_and_update();
    print_state(app, &initial);
    println!("{}", HELP);

    event_loop(app, states, spawn_stdin_reader(), tokio::signal::ctrl_c()).await;
    Ok(())
}

/// React to state changes and commands until `q`, end of input or `interrupt`.
///
/// A manual refresh is polled alongside the other branches so quitting never
/// waits on the network; quitting mid-request drops the request.
async fn event_loop(
    app: &App,
    mut states: watch::Receiver<RefreshState>,
    mut commands: mpsc::UnboundedReceiver<String>,
    interrupt: impl Future,
) {
    let controller = app.controller();
    let mut refreshing: Option<Pin<Box<dyn Future<Output = RefreshState> + '_>>> = None;
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                print_state(app, &state);
            }
            Some(_) = async {
                match refreshing.as_mut() {
                    Some(refresh) => Some(refresh.await),
                    None => None,
                }
            }, if refreshing.is_some() => {
                refreshing = None;
            }
            line = commands.recv() => {
                let Some(line) = line else {
                    info!("stdin closed");
                    break;
                };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(Command::Refresh) => {
                        if refreshing.is_some() {
                            println!("Update already in progress");
                        } else {
                            refreshing = Some(Box::pin(controller.force_refresh()));
                        }
                    }
                    Ok(Command::Interval(interval)) => {
                        controller.set_interval(interval);
                        println!("Refreshing every {}", interval);
                    }
                    Err(e) => {
                        if !line.trim().is_empty() {
                            println!("{}\n{}", e, HELP);
                        }
                    }
                }
            }
            _ = &mut interrupt => {
                info!("Interrupted");
                break;
            }
        }
    }
}

fn print_state(app: &App, state: &RefreshState) {
    if let Some(text) = render::state(app.location(), state) {
        println!("{}", text);
    }
}

/// Read stdin on a plain thread so a pending read never holds up shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// App whose forecast endpoint takes far longer than any test waits.
    async fn slow_app(server: &MockServer) -> App {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(server)
            .await;

        let mut config = Config::default();
        config.weather.api_url = server.uri();
        config.weather.request_timeout_secs = 60;
        App::new(
            config,
            AppOptions {
                no_cache: true,
                refresh: None,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_quit_while_manual_refresh_in_flight() {
        let server = MockServer::start().await;
        let app = slow_app(&server).await;
        let states = app.controller().subscribe();
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send("r".to_string()).unwrap();
        let quit = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = quit.send("q".to_string());
        });

        tokio::time::timeout(
            Duration::from_secs(5),
            event_loop(&app, states, rx, std::future::pending::<()>()),
        )
        .await
        .unwrap();

        assert!(app.controller().state().is_loading());
        assert_eq!(app.controller().network_fetches(), 1);
    }

    #[tokio::test]
    async fn test_interrupt_while_manual_refresh_in_flight() {
        let server = MockServer::start().await;
        let app = slow_app(&server).await;
        let states = app.controller().subscribe();
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send("r".to_string()).unwrap();
        tx.send("r".to_string()).unwrap();

        tokio::time::timeout(
            Duration::from_secs(5),
            event_loop(
                &app,
                states,
                rx,
                tokio::time::sleep(Duration::from_millis(200)),
            ),
        )
        .await
        .unwrap();

        assert_eq!(app.controller().network_fetches(), 1);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("r"), Ok(Command::Refresh));
        assert_eq!(parse_command(" q \n"), Ok(Command::Quit));
        assert_eq!(
            parse_command("30"),
            Ok(Command::Interval(RefreshInterval::Minutes30))
        );
        assert!(parse_command("45").is_err());
        assert!(parse_command("later").is_err());
    }

    #[test]
    fn test_cli_flags() {
        let cli =
            Cli::try_parse_from(["quantum", "--refresh", "180", "--once", "--no-cache"]).unwrap();
        assert_eq!(cli.refresh, Some(RefreshInterval::Hours3));
        assert!(cli.once);
        assert!(cli.no_cache);
        assert!(cli.config.is_none());

        assert!(Cli::try_parse_from(["quantum", "--refresh", "20"]).is_err());
    }
}
