use clap::{Parser, Subcommand, ValueEnum};
use home_shadow::config::{self, Config};
use home_shadow::role::Role;
use home_shadow::services::{DirBlobStore, DocumentStore, FileDocuments};
use home_shadow::shadow::{CurtainDirection, HomeShadow, LIGHT_COUNT, StateMirror, light_label};
use home_shadow::simulation::run_sensor_simulation;
use home_shadow::tree::{MqttTree, RealtimeTree, TreeLayout};
use home_shadow::{Result, ShadowError};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// How long light commands wait for the mirrored light bank.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "home-shadow")]
#[command(about = "Mirror and control the house through its realtime tree")]
struct Cli {
    /// Role the commands are issued as
    #[arg(long, env = "HOME_ROLE", default_value = "child")]
    role: Role,

    /// Name recorded with access attempts
    #[arg(long, env = "HOME_ACTOR", default_value = "Unknown")]
    actor: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print sensors, lights and the event log whenever they change
    Watch,
    /// Move the curtain (up, down, stop)
    Curtain { direction: CurtainDirection },
    /// Arm or disarm the alarm
    Alarm { state: Switch },
    /// Control one of the lights
    Light {
        #[command(subcommand)]
        action: LightAction,
    },
    /// Submit a PIN at the door
    Pin { candidate: String },
    /// List access attempts and manual events
    History,
    /// Publish fake sensor readings
    Simulate {
        /// Seconds between readings
        #[arg(long, default_value_t = 5)]
        period: u64,
    },
}

#[derive(Subcommand)]
enum LightAction {
    /// Switch a light on or off based on its current state
    Toggle { index: usize },
    /// Set the intensity of a light (0-255)
    Intensity { index: usize, value: u8 },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    // The environment is only written before the runtime spawns its workers.
    config::load_dotenv();
    init_logger();

    let cli = Cli::parse();
    let config = Config::from_env();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start the async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli, config)) {
        let dialog = e.dialog();
        error!("{}: {} ({})", dialog.title, dialog.message, e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let documents: Arc<dyn DocumentStore> =
        Arc::new(FileDocuments::new(config.storage.data_dir.join("documents")));

    if let Commands::History = cli.command {
        return print_history(cli.role, documents.as_ref()).await;
    }

    info!(
        "Connecting to MQTT broker at {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );
    let mqtt = Arc::new(MqttTree::connect(&config.mqtt, &config.tree.prefix).await?);
    let tree: Arc<dyn RealtimeTree> = mqtt.clone();
    let layout = TreeLayout::default();

    if let Commands::Simulate { period } = cli.command {
        let simulation = run_sensor_simulation(tree, layout, Duration::from_secs(period.max(1)));
        info!("Simulation running, press Ctrl+C to exit");
        wait_for_shutdown().await;
        simulation.abort();
        mqtt.disconnect().await;
        return Ok(());
    }

    let shadow = HomeShadow::attach(
        tree,
        documents,
        Arc::new(DirBlobStore::new(config.storage.data_dir.join("blobs"))),
        layout,
        config.access.clone(),
        cli.role,
        cli.actor.clone(),
    );

    let outcome = match cli.command {
        Commands::Watch => {
            watch(&shadow.mirror).await;
            Ok(())
        }
        Commands::Curtain { direction } => shadow.commands.set_curtain(direction).await,
        Commands::Alarm { state } => {
            shadow
                .commands
                .set_alarm(matches!(state, Switch::On))
                .await
        }
        Commands::Light { action } => {
            settle_lights(&shadow.mirror).await;
            match action {
                LightAction::Toggle { index } => shadow
                    .commands
                    .toggle_light(index)
                    .await
                    .map(|on| info!("Light {} is now {}", index, if on { "on" } else { "off" })),
                LightAction::Intensity { index, value } => {
                    shadow.commands.set_light_intensity(index, value).await
                }
            }
        }
        Commands::Pin { candidate } => shadow.access.submit_pin(&candidate).await.map(|outcome| {
            let dialog = outcome.dialog();
            info!("{}: {}", dialog.title, dialog.message);
        }),
        Commands::History | Commands::Simulate { .. } => Ok(()),
    };

    shadow.close().await;
    mqtt.disconnect().await;
    outcome
}

async fn print_history(role: Role, documents: &dyn DocumentStore) -> Result<()> {
    if !role.can_view_history() {
        return Err(ShadowError::HistoryHidden);
    }

    let entries = documents.entries().await?;
    if entries.is_empty() {
        println!("No entries yet");
    }
    for entry in entries {
        println!(
            "{}  {:<24} {:<16} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.added_by,
            entry.status_text(),
            entry.image_url
        );
    }
    Ok(())
}

/// Wait until the light bank is mirrored, or give up after a short while.
async fn settle_lights(mirror: &StateMirror) {
    if tokio::time::timeout(SETTLE_TIMEOUT, mirror.wait_for_lights())
        .await
        .is_err()
    {
        info!("No mirrored light state yet, using defaults");
    }
}

async fn watch(mirror: &StateMirror) {
    info!("Watching, press Ctrl+C to exit");
    loop {
        tokio::select! {
            _ = mirror.changed() => print_state(mirror),
            _ = wait_for_shutdown() => break,
        }
    }
}

fn print_state(mirror: &StateMirror) {
    println!("---");
    for reading in mirror.readings() {
        println!("{:<14} {}", reading.name.to_string(), reading.value);
    }
    for index in 0..LIGHT_COUNT {
        let light = mirror.lights().get(index).unwrap_or_default();
        println!(
            "{:<14} {} ({})",
            light_label(index).unwrap_or("?"),
            if light.is_on { "on" } else { "off" },
            light.intensity
        );
    }
    for entry in mirror.log().entries().iter().take(10) {
        println!("  {}", entry.text);
    }
}

async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
