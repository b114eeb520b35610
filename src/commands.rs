//! Command handlers

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, Utc};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;

use motorent_admin::config::AppConfig;
use motorent_admin::errors::AppError;
use motorent_admin::models::{Booking, FleetSummary, Vehicle};
use motorent_admin::output::{self, OutputFormat};
use motorent_admin::services::booking_form::BookingDraft;
use motorent_admin::services::bookings::filter_bookings;
use motorent_admin::services::catalog::VehicleCatalog;
use motorent_admin::services::customers::CustomerForm;
use motorent_admin::services::logs::{FetchOutcome, LogQuery, LogViewer};
use motorent_admin::services::pricing::RangeStatus;
use motorent_admin::services::schedule::{Schedule, ScheduleFilter, ViewKind};
use motorent_admin::services::search::{SearchField, SearchSource};
use motorent_admin::services::vehicles::VehicleForm;
use motorent_admin::services::{ListParams, Upload};
use motorent_admin::state::AppState;

use crate::cli::{
    BookingCommand, Cli, Commands, CustomerArgs, CustomerCommand, DraftArgs, ListArgs, LogArgs,
    SearchTarget, VehicleArgs, VehicleCommand,
};

/// Execute CLI command
pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
    let state = AppState::init(config)?;
    let format = cli.format;

    match cli.command {
        Commands::Login { email, password } => cmd_login(&state, &email, password).await,
        Commands::Logout => {
            state.auth.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Commands::Whoami => cmd_whoami(&state, format),
        Commands::Vehicles { action } => cmd_vehicles(&state, format, action).await,
        Commands::Customers { action } => cmd_customers(&state, format, action).await,
        Commands::Bookings { action } => cmd_bookings(&state, format, action).await,
        Commands::Schedule {
            view,
            date,
            types,
            statuses,
            search,
        } => {
            let filter = ScheduleFilter {
                types: (!types.is_empty()).then(|| types.into_iter().collect()),
                statuses: if statuses.is_empty() {
                    ScheduleFilter::default().statuses
                } else {
                    statuses.into_iter().collect()
                },
                search,
            };
            let anchor = date.unwrap_or_else(|| Local::now().date_naive());
            cmd_schedule(&state, format, view.into(), anchor, &filter).await
        }
        Commands::Logs(args) => cmd_logs(&state, format, args).await,
        Commands::Search { target } => match target {
            SearchTarget::Customers => {
                let source = Arc::clone(&state.customers);
                cmd_search(
                    source,
                    state.config.search_debounce(),
                    state.config.request_timeout(),
                    |c| c.label(),
                )
                .await
            }
            SearchTarget::Vehicles => {
                let source = Arc::clone(&state.vehicles);
                cmd_search(
                    source,
                    state.config.search_debounce(),
                    state.config.request_timeout(),
                    |v| {
                        format!(
                            "{}  {} {}  {}",
                            v.license_plate,
                            v.brand,
                            v.vehicle_type,
                            output::format_vnd(v.price_per_day)
                        )
                    },
                )
                .await
            }
        },
    }
}

/// Turns a library error into the message the operator should read.
fn report(err: AppError, fallback: &str) -> anyhow::Error {
    if let AppError::Unauthorized { .. } = err {
        return anyhow!(
            "{} (run `motorent-admin login`)",
            err.user_message("Session expired or invalid").unwrap_or_default()
        );
    }
    match err.user_message(fallback) {
        Some(message) => anyhow!(message),
        None => anyhow!("cancelled"),
    }
}

fn emit<T: Serialize + ?Sized>(format: OutputFormat, value: &T, table: impl FnOnce() -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", output::to_json(value)?),
        OutputFormat::Table => println!("{}", table()),
    }
    Ok(())
}

/// JSON shape of `vehicles list`.
#[derive(Serialize)]
struct VehicleListing<'a> {
    items: &'a [Vehicle],
    summary: FleetSummary,
}

fn read_line_from_stdin(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn cmd_login(state: &AppState, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_line_from_stdin("Password: ")?,
    };
    let claims = state
        .auth
        .login(email, &password)
        .await
        .map_err(|e| report(e, "Login failed"))?;

    println!("Logged in as {email}.");
    if let Some(exp) = claims.and_then(|c| c.expires_at()) {
        println!("Token expires {}", output::format_local(exp));
    }
    Ok(())
}

fn cmd_whoami(state: &AppState, format: OutputFormat) -> Result<()> {
    if state.session.token().is_none() {
        bail!("not logged in");
    }
    let Some(claims) = state.session.claims() else {
        bail!("stored token is not a readable JWT");
    };

    let expired = claims.is_expired_at(Utc::now());
    if format == OutputFormat::Json {
        let value = serde_json::json!({
            "sub": claims.sub,
            "email": claims.email,
            "role": claims.role,
            "expiresAt": claims.expires_at(),
            "expired": expired,
        });
        println!("{}", output::to_json(&value)?);
        return Ok(());
    }

    println!("Subject: {}", claims.sub.as_deref().unwrap_or("-"));
    if let Some(email) = &claims.email {
        println!("Email:   {email}");
    }
    if let Some(role) = &claims.role {
        println!("Role:    {role}");
    }
    match claims.expires_at() {
        Some(exp) if expired => println!("Expired: {}", output::format_local(exp)),
        Some(exp) => println!("Expires: {}", output::format_local(exp)),
        None => println!("Expires: never"),
    }
    Ok(())
}

fn list_params(args: &ListArgs) -> ListParams {
    ListParams {
        page: args.page,
        limit: args.limit,
        search: args.search.clone(),
    }
}

async fn vehicle_form(args: VehicleArgs) -> Result<VehicleForm> {
    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        images.push(
            Upload::from_path(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
        );
    }
    Ok(VehicleForm {
        license_plate: args.plate,
        vehicle_type: args.vehicle_type,
        brand: args.brand,
        price_per_day: args.price,
        status: args.status,
        color: args.color,
        year: args.year,
        images,
    })
}

async fn cmd_vehicles(state: &AppState, format: OutputFormat, action: VehicleCommand) -> Result<()> {
    match action {
        VehicleCommand::List(args) => {
            let page = state
                .vehicles
                .list(&list_params(&args), None)
                .await
                .map_err(|e| report(e, "Failed to load vehicles"))?;
            let summary = FleetSummary::from_vehicles(&page.items);
            let listing = VehicleListing {
                items: &page.items,
                summary,
            };
            emit(format, &listing, || {
                format!(
                    "{}\n\n{}\n{}",
                    output::vehicles_table(&page.items),
                    output::fleet_summary_line(&summary),
                    output::page_footer(&page)
                )
            })
        }
        VehicleCommand::Add(args) => {
            let vehicle = state
                .vehicles
                .create(vehicle_form(args).await?)
                .await
                .map_err(|e| report(e, "Failed to add vehicle"))?;
            emit(format, &vehicle, || format!("Added vehicle {} ({})", vehicle.license_plate, vehicle.id))
        }
        VehicleCommand::Update { id, fields } => {
            let vehicle = state
                .vehicles
                .update(&id, vehicle_form(fields).await?)
                .await
                .map_err(|e| report(e, "Failed to update vehicle"))?;
            emit(format, &vehicle, || format!("Updated vehicle {} ({})", vehicle.license_plate, vehicle.id))
        }
        VehicleCommand::Delete { id } => {
            state
                .vehicles
                .delete(&id)
                .await
                .map_err(|e| report(e, "Failed to delete vehicle"))?;
            println!("Deleted vehicle {id}");
            Ok(())
        }
    }
}

async fn customer_form(args: CustomerArgs) -> Result<CustomerForm> {
    let upload = |path: Option<std::path::PathBuf>| async move {
        match path {
            Some(path) => Upload::from_path(&path)
                .await
                .map(Some)
                .with_context(|| format!("failed to read {}", path.display())),
            None => Ok(None),
        }
    };
    Ok(CustomerForm {
        name: args.name,
        phone: args.phone,
        national_id: args.cccd,
        driver_license: args.driver_license,
        notes: args.notes,
        national_id_image: upload(args.cccd_image).await?,
        driver_license_image: upload(args.driver_license_image).await?,
    })
}

async fn cmd_customers(state: &AppState, format: OutputFormat, action: CustomerCommand) -> Result<()> {
    match action {
        CustomerCommand::List(args) => {
            let page = state
                .customers
                .list(&list_params(&args), None)
                .await
                .map_err(|e| report(e, "Failed to load customers"))?;
            emit(format, &page.items, || {
                format!("{}\n\n{}", output::customers_table(&page.items), output::page_footer(&page))
            })
        }
        CustomerCommand::Add(args) => {
            let customer = state
                .customers
                .create(customer_form(args).await?)
                .await
                .map_err(|e| report(e, "Failed to add customer"))?;
            emit(format, &customer, || format!("Added customer {} ({})", customer.label(), customer.id))
        }
        CustomerCommand::Update { id, fields } => {
            let customer = state
                .customers
                .update(&id, customer_form(fields).await?)
                .await
                .map_err(|e| report(e, "Failed to update customer"))?;
            emit(format, &customer, || format!("Updated customer {} ({})", customer.label(), customer.id))
        }
        CustomerCommand::Delete { id } => {
            state
                .customers
                .delete(&id)
                .await
                .map_err(|e| report(e, "Failed to delete customer"))?;
            println!("Deleted customer {id}");
            Ok(())
        }
    }
}

async fn load_catalog(state: &AppState) -> Result<VehicleCatalog> {
    state
        .vehicles
        .catalog(state.config.vehicle_lookup_limit, None)
        .await
        .map_err(|e| report(e, "Failed to load vehicles"))
}

/// Adds search hits for `--vehicle` values the catalog does not know, so a
/// vehicle past the lookup limit can still be priced or named by plate.
async fn extend_catalog(state: &AppState, catalog: &mut VehicleCatalog, keys: &[String]) -> Result<()> {
    let missing: Vec<&String> = keys.iter().filter(|k| catalog.get(k).is_none()).collect();
    if missing.is_empty() {
        return Ok(());
    }

    let mut listed = Vec::new();
    for key in missing {
        let params = ListParams {
            search: key.clone(),
            ..ListParams::default()
        };
        let page = state
            .vehicles
            .list(&params, None)
            .await
            .map_err(|e| report(e, "Failed to look up vehicles"))?;
        listed.extend(page.items);
    }
    tracing::debug!(found = listed.len(), "vehicles looked up outside the catalog");
    catalog.set_listed(listed);
    Ok(())
}

async fn load_bookings(state: &AppState) -> Result<Vec<Booking>> {
    let page = state
        .bookings
        .list(None, None)
        .await
        .map_err(|e| report(e, "Failed to load bookings"))?;
    Ok(page.items)
}

/// Applies the command-line fields to `draft` in form order, so each step
/// recomputes the total the way the booking form does.
fn fill_draft(draft: &mut BookingDraft, args: &DraftArgs, catalog: &VehicleCatalog) -> Result<()> {
    let now = Local::now().naive_local();
    if let Some(customer) = &args.customer {
        draft.customer = customer.clone();
    }
    if !args.vehicles.is_empty() {
        let ids: Vec<String> = args.vehicles.iter().map(|k| catalog.resolve(k).to_string()).collect();
        draft.set_vehicles(ids, catalog);
    }
    if args.start_now {
        draft.start_now(now, catalog);
    } else if let Some(start) = &args.start {
        draft.set_start(start, catalog);
    }
    if let Some(days) = args.days {
        draft.end_plus_days(days, now, catalog)?;
    } else if let Some(end) = &args.end {
        draft.set_end(end, catalog);
    }
    if let Some(total) = args.total {
        draft.set_total_price(total);
    }
    if let Some(color) = &args.color {
        draft.color = Some(color.clone());
    }

    if draft.start_in_past(now) {
        tracing::warn!(start = draft.start(), "booking starts in the past");
        eprintln!("Warning: the start time is in the past.");
    }
    Ok(())
}

fn draft_summary(draft: &BookingDraft, catalog: &VehicleCatalog) -> String {
    let plates = draft
        .vehicles()
        .iter()
        .map(|id| catalog.plate_or_id(id))
        .collect::<Vec<_>>()
        .join(", ");
    let range = match draft.range_status() {
        RangeStatus::Valid { days } => format!("{} → {} ({days} day(s))", draft.start(), draft.end()),
        RangeStatus::Incomplete => "incomplete".to_string(),
        RangeStatus::Invalid => "invalid: end must be after start".to_string(),
    };
    format!(
        "Customer: {}\nVehicles: {}\nPeriod:   {range}\nTotal:    {}",
        if draft.customer.is_empty() { "-" } else { draft.customer.as_str() },
        if plates.is_empty() { "-".to_string() } else { plates },
        output::format_vnd(draft.total_price())
    )
}

fn submit_failure(err: AppError, draft: &BookingDraft, catalog: &VehicleCatalog, fallback: &str) -> anyhow::Error {
    match err.overlap() {
        Some(conflict) => {
            tracing::warn!(reason = %conflict.reason, "booking overlaps an existing one");
            anyhow!(conflict.render(catalog, draft.start(), draft.end()))
        }
        None => report(err, fallback),
    }
}

async fn cmd_bookings(state: &AppState, format: OutputFormat, action: BookingCommand) -> Result<()> {
    match action {
        BookingCommand::List { search } => {
            let (bookings, catalog) = tokio::try_join!(load_bookings(state), load_catalog(state))?;
            let shown = filter_bookings(&bookings, &search);
            emit(format, &shown, || {
                format!("{}\n\n{} booking(s)", output::bookings_table(&shown, &catalog), shown.len())
            })
        }
        BookingCommand::Quote(args) => {
            let mut catalog = load_catalog(state).await?;
            extend_catalog(state, &mut catalog, &args.vehicles).await?;
            let mut draft = BookingDraft::new();
            fill_draft(&mut draft, &args, &catalog)?;
            println!("{}", draft_summary(&draft, &catalog));
            if let Err(e) = draft.validate() {
                println!("Not submittable: {}", e.user_message("invalid booking").unwrap_or_default());
            }
            Ok(())
        }
        BookingCommand::Create(args) => {
            let mut catalog = load_catalog(state).await?;
            extend_catalog(state, &mut catalog, &args.vehicles).await?;
            let mut draft = BookingDraft::new();
            fill_draft(&mut draft, &args, &catalog)?;

            let payload = draft.create_payload().map_err(|e| report(e, "Invalid booking"))?;
            let booking = state
                .bookings
                .create(&payload)
                .await
                .map_err(|e| submit_failure(e, &draft, &catalog, "Failed to create booking"))?;
            emit(format, &booking, || {
                format!("Created booking {}\n{}", booking.id, draft_summary(&draft, &catalog))
            })
        }
        BookingCommand::Update { id, draft: args, status } => {
            let (bookings, mut catalog) = tokio::try_join!(load_bookings(state), load_catalog(state))?;
            extend_catalog(state, &mut catalog, &args.vehicles).await?;
            let existing = bookings
                .iter()
                .find(|b| b.id == id)
                .ok_or_else(|| anyhow!("booking {id} not found"))?;

            let mut draft = BookingDraft::edit(existing);
            fill_draft(&mut draft, &args, &catalog)?;
            if let Some(status) = status {
                draft.status = Some(status);
            }

            let payload = draft.update_payload().map_err(|e| report(e, "Invalid booking"))?;
            let booking = state
                .bookings
                .update(&id, &payload)
                .await
                .map_err(|e| submit_failure(e, &draft, &catalog, "Failed to update booking"))?;
            emit(format, &booking, || {
                format!("Updated booking {}\n{}", booking.id, draft_summary(&draft, &catalog))
            })
        }
        BookingCommand::Delete { id } => {
            state
                .bookings
                .delete(&id)
                .await
                .map_err(|e| report(e, "Failed to delete booking"))?;
            println!("Deleted booking {id}");
            Ok(())
        }
    }
}

async fn cmd_schedule(
    state: &AppState,
    format: OutputFormat,
    view: ViewKind,
    anchor: chrono::NaiveDate,
    filter: &ScheduleFilter,
) -> Result<()> {
    let params = ListParams {
        limit: state.config.vehicle_lookup_limit,
        ..ListParams::default()
    };
    let (vehicles, bookings) = tokio::try_join!(
        async {
            state
                .vehicles
                .list(&params, None)
                .await
                .map_err(|e| report(e, "Failed to load vehicles"))
        },
        load_bookings(state),
    )?;

    let schedule = Schedule::build(&vehicles.items, &bookings);
    let known_types = schedule.vehicle_types();
    for unknown in filter.types.iter().flatten().filter(|t| !known_types.contains(t)) {
        eprintln!(
            "Warning: no vehicles of type `{unknown}` (known: {})",
            known_types.join(", ")
        );
    }
    let (from, to) = view.window(anchor);
    let mut slice = schedule.filtered(filter);
    slice.events.retain(|e| e.intersects(from, to));

    tracing::debug!(view = %view, events = slice.events.len(), "schedule window");
    emit(format, &slice, || output::schedule_text(&slice, from, to))
}

fn log_query(args: &LogArgs) -> LogQuery {
    LogQuery {
        actor: args.actor.clone(),
        action: args.action.clone(),
        entity: args.entity.clone(),
        status: args.status,
        from: args.from,
        to: args.to,
        page: args.page,
        limit: args.limit,
    }
}

async fn cmd_logs(state: &AppState, format: OutputFormat, args: LogArgs) -> Result<()> {
    let viewer = LogViewer::new(state.logs.clone());
    let query = log_query(&args);
    let page = query.page;
    viewer.edit_filters(|q| *q = query);

    let mut outcome = Some(viewer.fetch(Some(page)).await);
    loop {
        if outcome.is_some() {
            let snapshot = viewer.snapshot();
            if let Some(error) = &snapshot.error {
                if !args.interactive {
                    bail!("{error}");
                }
                eprintln!("Error: {error}");
            } else if outcome == Some(FetchOutcome::Applied) {
                emit(format, &snapshot.items, || {
                    format!(
                        "{}\n\n{}",
                        output::logs_table(&snapshot.items),
                        output::page_position(
                            snapshot.params.page,
                            snapshot.page_count(),
                            snapshot.total
                        )
                    )
                })?;
            }
        }
        if !args.interactive {
            return Ok(());
        }

        let command = read_line_from_stdin("[n]ext [p]rev [c]lear [q]uit > ")?;
        outcome = match command.trim() {
            "n" => viewer.next_page().await,
            "p" => viewer.prev_page().await,
            "c" => Some(viewer.clear_filters().await),
            "q" | "" => return Ok(()),
            other => {
                eprintln!("unknown command `{other}`");
                None
            }
        };
    }
}

/// Feeds stdin lines into a debounced search field and prints each result set.
async fn cmd_search<S, F>(
    source: Arc<S>,
    debounce: Duration,
    request_timeout: Duration,
    label: F,
) -> Result<()>
where
    S: SearchSource,
    F: Fn(&S::Item) -> String + Send + 'static,
{
    let field = SearchField::new(source, debounce);
    let mut updates = field.updates();

    let printer = tokio::spawn(async move {
        let mut last_query: Option<String> = None;
        while let Some(state) = updates.next().await {
            if state.loading || state.pending.is_some() {
                continue;
            }
            if let Some(error) = &state.error {
                eprintln!("Error: {error}");
                continue;
            }
            if state.query.is_empty() || last_query.as_deref() == Some(state.query.as_str()) {
                continue;
            }
            println!("── {} result(s) for \"{}\"", state.items.len(), state.query);
            for item in &state.items {
                println!("  {}", label(item));
            }
            last_query = Some(state.query);
        }
    });

    eprintln!("Type to search, one query per line. Ctrl-D to finish.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read from stdin")? {
        field.set_query(line.trim());
    }

    if field.settled(debounce + request_timeout).await.is_none() {
        let state = field.current();
        tracing::warn!(query = ?state.pending, "search still in flight at exit");
        eprintln!("Warning: the last search did not finish in time.");
    }

    // dropping the field closes the stream once the printer has drained it
    drop(field);
    printer.await.context("search printer failed")?;
    Ok(())
}
