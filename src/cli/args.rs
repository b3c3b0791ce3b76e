use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "meet-gateway")]
#[command(about = "Meeting bot gateway with delayed scrum feedback", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the gateway HTTP service (default)
    Serve,
    /// Print version information
    Version,
    /// Control meeting bots on a running gateway
    Meeting(MeetingCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct MeetingCliArgs {
    /// Gateway base URL (defaults to http://127.0.0.1:<server.port>)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: MeetingCommand,
}

#[derive(Subcommand, Debug)]
pub enum MeetingCommand {
    /// Send a bot into a meeting
    Start {
        /// Meeting link to join
        url: String,
    },
    /// Remove a bot from its meeting
    Stop { bot_id: String },
    /// Show status of a tracked bot
    Status { bot_id: String },
    /// Print the transcript collected so far
    Transcript { bot_id: String },
    /// List tracked bots
    List,
}
