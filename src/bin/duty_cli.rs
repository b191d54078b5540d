use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use duty_desk::api_client::ApiConfig;
use duty_desk::client::{DutyDeskClient, RestCollection};
use duty_desk::controller::RecordListController;
use duty_desk::error::ControllerError;
use duty_desk::models::{Constable, Duty, EntityKind, Station};
use duty_desk::overview::Overview;
use duty_desk::record::Record;
use duty_desk::session::{require_session, LocalFlagSession, SessionGuard};
use duty_desk::status::{Clock, SystemClock};
use duty_desk::ui::run_record_browser;
use duty_desk::view::{SortDirection, SortSpec};
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, rename_all = "snake_case")]
struct Args {
    /// Command to execute: list, create, update, delete, overview, browse, login, logout
    #[arg(short, long)]
    command: String,

    /// Collection to work on: stations, constables, duties, admins
    #[arg(short, long, default_value = "duties")]
    entity: String,

    /// API base URL (or set DUTY_DESK_API_URL env var)
    #[arg(long, name = "api_url")]
    api_url: Option<String>,

    /// Free-text search on the collection's search field (for list and browse)
    #[arg(short, long)]
    search: Option<String>,

    /// Exact-match filter as field=value, repeatable (for list and browse)
    #[arg(short, long)]
    filter: Vec<String>,

    /// Sort field, prefix with '-' for descending (for list)
    #[arg(long)]
    sort: Option<String>,

    /// Page to show, starting at 1 (for list)
    #[arg(short, long, default_value = "1")]
    page: usize,

    /// Records per page (or set DUTY_DESK_PAGE_SIZE env var)
    #[arg(long, name = "per_page")]
    per_page: Option<usize>,

    /// Record ID (for update and delete commands)
    #[arg(long)]
    id: Option<String>,

    /// Record data as JSON (for create and update commands)
    #[arg(long)]
    json: Option<String>,

    /// Confirm a delete without asking
    #[arg(short, long, default_value = "false")]
    yes: bool,

    /// Admin email (for login command)
    #[arg(long)]
    email: Option<String>,

    /// Print list and overview output as JSON
    #[arg(long, default_value = "false")]
    as_json: bool,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,
}

// example usage:
// DUTY_DESK_API_URL=http://localhost:5000/api ./target/release/duty_cli --command login --email chief@police.gov.in
// ./target/release/duty_cli --command list --entity duties --filter status="In Progress" --per_page 10
// ./target/release/duty_cli --command list --entity constables --search ravi --filter policeStation="Central Station"
// ./target/release/duty_cli --command create --entity stations --json '{"name": "North Station", "location": "Ward 9"}'
// ./target/release/duty_cli --command update --entity duties --id 665f1c2a --json '{"badgeNumber": "B-1", "policeStation": "Central Station", "dutyDate": "2024-06-12"}'
// ./target/release/duty_cli --command delete --entity admins --id 665f1c2b --yes
// ./target/release/duty_cli --command overview
// ./target/release/duty_cli --command browse --entity constables

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they never mix with command output or the dashboard
    tracing_subscriber::fmt()
        .with_env_filter(format!("duty_desk={}", args.log_level))
        .with_writer(std::io::stderr)
        .init();

    // Resolved before anything touches the API so a typo cannot hit another collection
    let entity: EntityKind = args.entity.parse()?;

    let mut config = ApiConfig::from_env_with_url(args.api_url.clone())?;
    if let Some(per_page) = args.per_page {
        config.items_per_page = per_page.max(1);
    }
    debug!(api_url = %config.api_url, "configuration loaded");

    let mut session = LocalFlagSession::new(config.session_file.clone());

    match args.command.as_str() {
        "login" => {
            let email = args
                .email
                .as_deref()
                .ok_or_else(|| anyhow!("email required for login"))?;
            session.sign_in(email)?;
            println!("Signed in as {}", email.trim());
            return Ok(());
        }
        "logout" => {
            session.sign_out()?;
            println!("Signed out");
            return Ok(());
        }
        _ => {}
    }

    if let Err(e) = require_session(&session) {
        eprintln!("{} (run --command login --email <address> first)", e);
        std::process::exit(1);
    }

    let client = DutyDeskClient::new(config)?;

    if args.command == "overview" {
        return show_overview(&client, &args).await;
    }

    match entity {
        EntityKind::Stations => run_command(client.stations(), &client, &args).await,
        EntityKind::Constables => run_command(client.constables(), &client, &args).await,
        EntityKind::Duties => run_command(client.duties(), &client, &args).await,
        EntityKind::Admins => run_command(client.admins(), &client, &args).await,
    }
}

async fn run_command<R: Record>(
    backend: RestCollection<R>,
    client: &DutyDeskClient,
    args: &Args,
) -> Result<()> {
    let config = client.config();
    let mut controller = RecordListController::new(backend)
        .with_items_per_page(config.items_per_page)
        .with_timeout(config.timeout);

    match args.command.as_str() {
        "list" => {
            if let Err(e) = controller.load().await {
                eprintln!("{}", e);
                std::process::exit(1);
            }
            apply_view_args(&mut controller, args)?;
            print_page(&mut controller, args.as_json)?;
        }
        "browse" => {
            apply_view_args(&mut controller, args)?;
            run_record_browser(&mut controller).await?;
        }
        "create" => {
            let draft: R = parse_record(args)?;
            report(controller.create(draft).await);
        }
        "update" => {
            let id = args.id.as_deref().ok_or_else(|| anyhow!("id required for update"))?;
            let draft: R = parse_record(args)?;
            controller.request_edit(id)?;
            report(controller.confirm_edit(id, draft).await);
        }
        "delete" => {
            let id = args.id.as_deref().ok_or_else(|| anyhow!("id required for delete"))?;
            controller.request_delete(id)?;
            if !args.yes {
                controller.cancel_action(id);
                eprintln!("Refusing to delete {} {} without --yes", R::LABEL, id);
                std::process::exit(1);
            }
            report(controller.confirm_delete(id).await);
        }
        other => bail!("unknown command: {}", other),
    }

    Ok(())
}

fn parse_record<R: Record>(args: &Args) -> Result<R> {
    let json = args
        .json
        .as_deref()
        .ok_or_else(|| anyhow!("json required for {}", args.command))?;
    serde_json::from_str(json).with_context(|| format!("invalid {} JSON", R::LABEL))
}

fn apply_view_args<R: Record, B: duty_desk::client::RecordBackend<R>>(
    controller: &mut RecordListController<R, B>,
    args: &Args,
) -> Result<()> {
    if let Some(search) = &args.search {
        controller.set_search_text(search.clone());
    }
    for filter in &args.filter {
        let (field, value) = filter
            .split_once('=')
            .ok_or_else(|| anyhow!("filter must look like field=value, got {}", filter))?;
        if !R::FILTER_FIELDS.contains(&field) {
            bail!(
                "{} cannot be filtered by {} (try one of: {})",
                R::COLLECTION,
                field,
                R::FILTER_FIELDS.join(", ")
            );
        }
        controller.set_filter(field, Some(value.to_string()));
    }
    if let Some(sort) = &args.sort {
        let (field, direction) = match sort.strip_prefix('-') {
            Some(field) => (field, SortDirection::Descending),
            None => (sort.as_str(), SortDirection::Ascending),
        };
        controller.set_sort(Some(SortSpec {
            field: field.to_string(),
            direction,
        }));
    }
    controller.set_page(args.page);
    Ok(())
}

fn print_page<R: Record, B: duty_desk::client::RecordBackend<R>>(
    controller: &mut RecordListController<R, B>,
    as_json: bool,
) -> Result<()> {
    let today = controller.today();
    let view = controller.view();

    if as_json {
        // Rendered cells rather than wire records, so passwords stay masked
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = view
            .page
            .iter()
            .map(|record| {
                R::COLUMNS
                    .iter()
                    .zip(record.row(today))
                    .map(|(column, cell)| (column.to_string(), serde_json::Value::String(cell)))
                    .collect()
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", R::COLUMNS.join(" | "));
    for record in &view.page {
        println!("{}", record.row(today).join(" | "));
    }
    println!(
        "Page {}/{} ({} of {} {})",
        view.current_page, view.total_pages, view.filtered_count, view.total_count, R::COLLECTION
    );
    Ok(())
}

fn report(result: Result<duty_desk::controller::Notification, ControllerError>) {
    match result {
        Ok(notification) => println!("{}", notification.message),
        Err(ControllerError::Validation(errors)) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn show_overview(client: &DutyDeskClient, args: &Args) -> Result<()> {
    let (stations, constables, duties) = tokio::try_join!(
        load_all::<Station>(client),
        load_all::<Constable>(client),
        load_all::<Duty>(client),
    )?;
    let overview = Overview::compute(&stations, &constables, &duties, SystemClock.today());

    if args.as_json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("Stations:   {}", overview.total_stations);
    println!("Constables: {}", overview.total_constables);
    println!("Duties:     {}", overview.total_duties);
    println!();
    println!("Duties by status:");
    for (status, count) in &overview.duties_by_status {
        println!("  {:<12} {}", status.label(), count);
    }
    println!("Duties by station:");
    for (station, count) in &overview.duties_by_station {
        println!("  {:<24} {}", station, count);
    }
    println!("Constables by station:");
    for (station, count) in &overview.constables_by_station {
        println!("  {:<24} {}", station, count);
    }
    println!("Constables by rank:");
    for (rank, count) in &overview.constables_by_rank {
        println!("  {:<24} {}", rank, count);
    }
    Ok(())
}

async fn load_all<R: Record>(client: &DutyDeskClient) -> Result<Vec<R>> {
    let mut controller =
        RecordListController::new(client.collection::<R>()).with_timeout(client.config().timeout);
    controller.load().await?;
    Ok(controller.records().to_vec())
}
