use crate::shared::config::get_config;
use crate::shared::format::{format_time_short, format_timestamp, preview_text};
use crate::shared::loader::{load_rows, load_text};
use crate::shared::onboarding::OnboardRequest;
use crate::shared::stats::compute_stats;
use crate::shared::{
    self, AppointmentRecord, ConversationRow, FileNicknameStore, LeadRow, LeadSource,
    NicknameStore, TranscriptSummary, ViewMode,
};
use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

const CELL_WIDTH: usize = 28;

pub struct CliArgs {
    pub verbose: u8,
    pub command: CliCommands,
}

pub enum CliCommands {
    Transcript {
        file: PathBuf,
        user: Option<String>,
        json: bool,
        summary: bool,
    },
    Conversations {
        file: PathBuf,
        search: Option<String>,
    },
    Calendar {
        file: PathBuf,
        view: ViewMode,
        date: Option<NaiveDate>,
        step: i32,
    },
    Leads {
        file: PathBuf,
        source: LeadSource,
        csv: Option<PathBuf>,
    },
    Stats {
        leads: PathBuf,
        conversations: Option<PathBuf>,
    },
    Nickname {
        action: NicknameAction,
    },
    Onboard {
        file: PathBuf,
    },
}

pub enum NicknameAction {
    Set { key: String, nickname: String },
    Get { key: String },
    Remove { key: String },
    List,
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        _ => Level::DEBUG,
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

pub async fn run_cli(args: CliArgs) -> Result<()> {
    // Setup logging based on verbosity
    setup_logging(args.verbose);

    let offset = get_config().calendar.fixed_offset()?;

    match args.command {
        CliCommands::Transcript {
            file,
            user,
            json,
            summary,
        } => show_transcript(&file, user, json, summary).await?,
        CliCommands::Conversations { file, search } => {
            list_conversations(&file, search.as_deref()).await?
        }
        CliCommands::Calendar {
            file,
            view,
            date,
            step,
        } => match offset {
            Some(tz) => show_calendar(&file, view, date, step, &tz).await?,
            None => show_calendar(&file, view, date, step, &Local).await?,
        },
        CliCommands::Leads { file, source, csv } => match offset {
            Some(tz) => show_leads(&file, source, csv, &tz).await?,
            None => show_leads(&file, source, csv, &Local).await?,
        },
        CliCommands::Stats {
            leads,
            conversations,
        } => match offset {
            Some(tz) => show_stats(&leads, conversations.as_deref(), &tz).await?,
            None => show_stats(&leads, conversations.as_deref(), &Local).await?,
        },
        CliCommands::Nickname { action } => manage_nicknames(action)?,
        CliCommands::Onboard { file } => check_onboarding(&file).await?,
    }

    Ok(())
}

async fn show_transcript(
    file: &Path,
    user: Option<String>,
    json: bool,
    summary: bool,
) -> Result<()> {
    let content = match user {
        // A conversations export, pick the row for this user
        Some(user_id) => {
            let rows: Vec<ConversationRow> = load_rows(file).await?;
            let row = rows
                .into_iter()
                .find(|r| r.whatsapp_user_id == user_id)
                .ok_or_else(|| anyhow!("No conversation for user {}", user_id))?;
            row.content
        }
        None => Some(load_text(file).await?),
    };

    let messages = shared::parse_transcript(content.as_deref());

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if summary {
        let summary = TranscriptSummary::from_messages(&messages);
        println!("Transcript Summary:");
        println!("  Messages: {}", summary.total());
        println!("  Bot: {}", summary.bot_messages);
        println!("  User: {}", summary.user_messages);
        println!("  System: {}", summary.system_messages);
        if let (Some(first), Some(last)) = (&summary.first_timestamp, &summary.last_timestamp) {
            println!("  Time range: {} to {}", first, last);
        }
        return Ok(());
    }

    for message in &messages {
        match &message.timestamp {
            Some(ts) => println!("[{}] {:>4}: {}", ts, message.sender.short_name(), message.text),
            None => println!("{:>4}: {}", message.sender.short_name(), message.text),
        }
    }

    Ok(())
}

async fn list_conversations(file: &Path, search: Option<&str>) -> Result<()> {
    let rows: Vec<ConversationRow> = load_rows(file).await?;
    let matches = shared::filter_conversations(&rows, search.unwrap_or_default());

    if matches.is_empty() {
        println!("No conversations found.");
        return Ok(());
    }

    let store = open_nickname_store()?;

    println!("Found {} conversations:\n", matches.len());
    for (i, row) in matches.iter().enumerate() {
        let label = row
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or("-");
        println!("{}. {} [{}]", i + 1, shared::display_name(row), label);
        if let Some(nickname) = store.nickname_for(row) {
            println!("   Tag: {}", nickname);
        }
        println!("   Key: {}", shared::identity_key(row));
        if let Some(updated) = &row.updated_at {
            println!("   Updated: {}", updated);
        }
    }

    Ok(())
}

async fn show_calendar<Tz: TimeZone>(
    file: &Path,
    view: ViewMode,
    date: Option<NaiveDate>,
    step: i32,
    tz: &Tz,
) -> Result<()> {
    let today = shared::today(tz);
    let cursor = shared::step_by(date.unwrap_or(today), view, step);
    let (start, end) = shared::visible_range(cursor, view);

    let mut records: Vec<AppointmentRecord> = load_rows(file).await?;
    let loaded = records.len();
    records = shared::records_in_range(&records, start, end, tz);
    shared::sort_by_time(&mut records, tz);
    info!(
        "{} of {} appointments fall within {} to {}",
        records.len(),
        loaded,
        start,
        end
    );

    let buckets = shared::bucket_by_local_day(&records, tz);
    let count_on = |d: NaiveDate| buckets.get(&shared::date_key(d)).map_or(0, Vec::len);

    match view {
        ViewMode::Month => {
            println!("{}\n", cursor.format("%B %Y"));
            println!(" Mon   Tue   Wed   Thu   Fri   Sat   Sun");
            for week in shared::month_grid(cursor, today).chunks(7) {
                let line: Vec<String> = week
                    .iter()
                    .map(|cell| {
                        let day = cell.date.format("%d").to_string();
                        let day = if cell.in_month { day } else { format!("({})", day) };
                        let marker = if cell.is_today { "*" } else { " " };
                        match count_on(cell.date) {
                            0 => format!("{:>4}{} ", day, marker),
                            n => format!("{:>4}{}{}", day, marker, n),
                        }
                    })
                    .collect();
                println!("{}", line.join(""));
            }
        }
        ViewMode::Week => {
            println!("Week of {}\n", start.format("%b %-d, %Y"));
            for day in shared::week_grid(cursor) {
                let marker = if day == today { "*" } else { " " };
                println!("{}{}", marker, day.format("%a %b %-d"));
                for record in buckets.get(&shared::date_key(day)).into_iter().flatten() {
                    print_appointment(record, tz);
                }
            }
        }
        ViewMode::Day => {
            println!("{}\n", cursor.format("%A, %B %-d, %Y"));
            for slot in shared::day_grid(cursor, &buckets, tz) {
                if slot.appointments.is_empty() {
                    continue;
                }
                println!("{:02}:00", slot.hour);
                for record in &slot.appointments {
                    print_appointment(record, tz);
                }
            }
            if count_on(cursor) == 0 {
                println!("No appointments.");
            }
        }
    }

    Ok(())
}

fn print_appointment<Tz: TimeZone>(record: &AppointmentRecord, tz: &Tz) {
    println!(
        "   {} {}  {}",
        format_time_short(record.appointment_time.as_deref(), tz),
        record.title(),
        preview_text(record.requirements.as_deref(), 48)
    );
}

async fn show_leads<Tz: TimeZone>(
    file: &Path,
    source: LeadSource,
    csv: Option<PathBuf>,
    tz: &Tz,
) -> Result<()> {
    let rows: Vec<LeadRow> = load_rows(file).await?;
    let mut rows = shared::filter_by_source(rows, source);
    shared::sort_leads(&mut rows, tz);

    let columns = get_config().leads.columns.column_set(source).resolve(&rows);

    if let Some(out) = csv {
        let content = shared::to_csv(&columns, &rows);
        tokio::fs::write(&out, content)
            .await
            .with_context(|| format!("Failed to write {}", out.display()))?;
        println!("Exported {} {} leads to {}", rows.len(), source, out.display());
        return Ok(());
    }

    if rows.is_empty() {
        println!("No leads found.");
        return Ok(());
    }

    println!("Showing {} leads (Source = \"{}\")\n", source, source.backend_label());
    let header: Vec<String> = columns
        .iter()
        .map(|c| format!("{:<width$}", preview_text(Some(c.as_str()), CELL_WIDTH), width = CELL_WIDTH))
        .collect();
    println!("{}", header.join(" | "));

    for cells in shared::project(&rows, &columns) {
        let line: Vec<String> = cells
            .iter()
            .map(|c| {
                let text = if c.is_empty() { "-" } else { c.as_str() };
                format!("{:<width$}", preview_text(Some(text), CELL_WIDTH), width = CELL_WIDTH)
            })
            .collect();
        println!("{}", line.join(" | "));
    }

    Ok(())
}

async fn show_stats<Tz: TimeZone>(
    leads_file: &Path,
    conversations_file: Option<&Path>,
    tz: &Tz,
) -> Result<()> {
    let leads: Vec<LeadRow> = load_rows(leads_file).await?;
    let conversations: Vec<ConversationRow> = match conversations_file {
        Some(path) => load_rows(path).await?,
        None => Vec::new(),
    };

    let stats = compute_stats(&leads, &conversations, Utc::now(), tz, &get_config().stats);

    println!("Dashboard Overview:");
    println!("  Total leads: {}", stats.total_leads);
    println!(
        "  HOT: {}  WARM: {}  COLD: {}  Uncategorized: {}",
        stats.hot_leads, stats.warm_leads, stats.cold_leads, stats.uncategorized_leads
    );
    println!("  Appointments from today: {}", stats.appointments_from_today);
    if conversations_file.is_some() {
        println!("  Active conversations: {}", stats.active_conversations);
        println!("  Conversations today: {}", stats.conversations_today);
    }

    if !stats.upcoming.is_empty() {
        println!("\nNext Steps:");
        for upcoming in &stats.upcoming {
            let starts_at = upcoming.starts_at.to_rfc3339();
            println!(
                "  {} - {} ({})",
                format_timestamp(Some(starts_at.as_str()), tz),
                upcoming.appointment.title(),
                upcoming.time_until
            );
        }
    }

    Ok(())
}

fn open_nickname_store() -> Result<FileNicknameStore> {
    let path = get_config().get_nickname_path()?;
    FileNicknameStore::open(&path)
}

fn manage_nicknames(action: NicknameAction) -> Result<()> {
    let mut store = open_nickname_store()?;

    match action {
        NicknameAction::Set { key, nickname } => {
            store.set(&key, &nickname)?;
            println!("Saved tag for {}", key);
        }
        NicknameAction::Get { key } => match store.get(&key) {
            Some(nickname) => println!("{}", nickname),
            None => println!("No tag for {}", key),
        },
        NicknameAction::Remove { key } => {
            if store.remove(&key)? {
                println!("Removed tag for {}", key);
            } else {
                warn!("No tag stored for {}", key);
            }
        }
        NicknameAction::List => {
            let entries = store.entries();
            if entries.is_empty() {
                println!("No tags saved.");
            }
            for (key, nickname) in entries {
                println!("{} = {}", key, nickname);
            }
        }
    }

    Ok(())
}

async fn check_onboarding(file: &Path) -> Result<()> {
    let content = load_text(file).await?;
    let request: OnboardRequest = serde_json::from_str(&content)
        .with_context(|| format!("Invalid onboarding payload in {}", file.display()))?;

    let valid = request.validate()?;
    println!("Onboarding payload is valid:");
    println!("  Company: {} (slug: {})", valid.company_name, valid.slug);
    println!("  Email: {}", valid.email);
    println!("  Plan: {}", valid.plan);
    if let Some(phone) = &valid.phone {
        println!("  Phone: {}", phone);
    }

    Ok(())
}
