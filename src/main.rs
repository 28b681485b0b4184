use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use saasient_dash::cli::{self, CliArgs, CliCommands, NicknameAction};
use saasient_dash::shared::{LeadSource, ViewMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "saasient")]
#[command(about = "Inspect SaaSient dashboard exports: transcripts, leads and appointments")]
struct Cli {
    /// Increase log verbosity (-v warn, -vv info, -vvv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a WhatsApp transcript into messages
    Transcript {
        /// Raw transcript text, or a conversations export when --user is given
        file: PathBuf,
        /// whatsapp_user_id of the conversation to show
        #[arg(long)]
        user: Option<String>,
        /// Print messages as JSON
        #[arg(long)]
        json: bool,
        /// Print message counts only
        #[arg(long, conflicts_with = "json")]
        summary: bool,
    },
    /// List conversations from an export
    Conversations {
        file: PathBuf,
        /// Filter by name, label or phone
        #[arg(long)]
        search: Option<String>,
    },
    /// Render appointments as a day, week or month calendar
    Calendar {
        file: PathBuf,
        /// day, week or month
        #[arg(long, default_value = "month")]
        view: ViewMode,
        /// Cursor date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Pages to move from the cursor; negative goes back
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        step: i32,
    },
    /// Show or export qualified leads
    Leads {
        file: PathBuf,
        /// whatsapp or voice
        #[arg(long, default_value = "whatsapp")]
        source: LeadSource,
        /// Write a CSV export instead of printing
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Dashboard overview counts
    Stats {
        /// Leads export
        leads: PathBuf,
        /// Conversations export, for the active conversation count
        #[arg(long)]
        conversations: Option<PathBuf>,
    },
    /// Manage conversation tags
    Nickname {
        #[command(subcommand)]
        action: NicknameCommand,
    },
    /// Validate a customer onboarding payload (JSON)
    Onboard { file: PathBuf },
}

#[derive(Subcommand)]
enum NicknameCommand {
    /// Tag a conversation key (see `conversations` output)
    Set { key: String, nickname: String },
    Get { key: String },
    Remove { key: String },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook to handle broken pipe errors gracefully
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let panic_message = format!("{panic_info}");
        if panic_message.contains("Broken pipe") {
            // Silently exit when pipe is broken (e.g., piped to head, less, etc.)
            std::process::exit(0);
        }
        default_panic(panic_info);
    }));

    let args = Cli::parse();

    let command = match args.command {
        Commands::Transcript {
            file,
            user,
            json,
            summary,
        } => CliCommands::Transcript {
            file,
            user,
            json,
            summary,
        },
        Commands::Conversations { file, search } => CliCommands::Conversations { file, search },
        Commands::Calendar {
            file,
            view,
            date,
            step,
        } => CliCommands::Calendar {
            file,
            view,
            date,
            step,
        },
        Commands::Leads { file, source, csv } => CliCommands::Leads { file, source, csv },
        Commands::Stats {
            leads,
            conversations,
        } => CliCommands::Stats {
            leads,
            conversations,
        },
        Commands::Nickname { action } => CliCommands::Nickname {
            action: match action {
                NicknameCommand::Set { key, nickname } => NicknameAction::Set { key, nickname },
                NicknameCommand::Get { key } => NicknameAction::Get { key },
                NicknameCommand::Remove { key } => NicknameAction::Remove { key },
                NicknameCommand::List => NicknameAction::List,
            },
        },
        Commands::Onboard { file } => CliCommands::Onboard { file },
    };

    cli::run_cli(CliArgs {
        verbose: args.verbose,
        command,
    })
    .await
}
