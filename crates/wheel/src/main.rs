use clap::{Parser, Subcommand};
use roulette::SpeedPreset;
use std::time::Duration;
use tokio::runtime::Runtime;
use wheel::app::App;
use wheel::config;
use wheel::events::Command;
use wheel::sys::{client, runtime, ticker::TokioTicks};

#[derive(Parser, Debug)]
#[command(name = "wheel", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Run the wheel daemon (the default).
    Daemon,
    /// Spin the wheel.
    Start {
        /// Speed preset: slow, normal or fast. Random when omitted.
        #[arg(short, long)]
        speed: Option<SpeedPreset>,

        /// Stop on its own after this many seconds
        #[arg(short, long, conflicts_with = "resume")]
        auto_stop: Option<f64>,

        /// Continue a paused spin instead of starting a new one
        #[arg(short = 'c', long = "continue")]
        resume: bool,
    },
    /// Pause the current spin
    Pause,
    /// Continue a paused spin
    Restart,
    /// Stop the current spin where it is
    Stop,
    /// Jump straight to the part at this angle (degrees from the top)
    StopAt {
        #[arg(allow_negative_numbers = true)]
        degrees: f64,
    },
    /// Write the default config file and print its path
    Init,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => run_daemon(),
        Commands::Start {
            speed,
            auto_stop,
            resume,
        } => {
            let auto_stop = auto_stop.map(Duration::try_from_secs_f64).transpose()?;
            client::send_command(&Command::Start {
                speed,
                auto_stop,
                resume,
            })
        }
        Commands::Pause => client::send_command(&Command::Pause),
        Commands::Restart => client::send_command(&Command::Restart),
        Commands::Stop => client::send_command(&Command::Stop),
        Commands::StopAt { degrees } => client::send_command(&Command::StopAt(degrees)),
        Commands::Init => {
            let path = config::write_default_config()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn run_daemon() -> anyhow::Result<()> {
    let config = config::load_or_default();

    let (tx, rx) = async_channel::bounded(64);
    let rt = Runtime::new()?;

    // Start Background Services
    runtime::start_background_services(rt.handle(), tx.clone());

    let app = App::new(config, TokioTicks::new(rt.handle().clone(), tx))?;
    rt.block_on(app.run(rx));
    Ok(())
}
