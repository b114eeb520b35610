//! CLI definition using clap

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use motorent_admin::models::{BookingStatus, LogStatus, VehicleStatus};
use motorent_admin::output::OutputFormat;
use motorent_admin::services::schedule::ViewKind;

#[derive(Parser)]
#[command(name = "motorent-admin")]
#[command(version)]
#[command(about = "Admin console for the motorbike rental backend")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the bearer token
    Login {
        #[arg(long, short = 'e')]
        email: String,

        /// Read from stdin when omitted
        #[arg(long, short = 'p')]
        password: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// Show who the stored token belongs to
    Whoami,

    /// Manage the fleet
    Vehicles {
        #[command(subcommand)]
        action: VehicleCommand,
    },

    /// Manage customers
    Customers {
        #[command(subcommand)]
        action: CustomerCommand,
    },

    /// Manage bookings
    Bookings {
        #[command(subcommand)]
        action: BookingCommand,
    },

    /// Per-vehicle booking timeline
    Schedule {
        #[arg(long, value_enum, default_value_t = ScheduleView::Week)]
        view: ScheduleView,

        /// Any day inside the window (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Vehicle types to show (repeatable). All when omitted.
        #[arg(long = "type")]
        types: Vec<String>,

        /// Booking statuses to show (repeatable). All when omitted.
        #[arg(long = "status")]
        statuses: Vec<BookingStatus>,

        /// Match on licence plate or customer
        #[arg(long, short = 's', default_value = "")]
        search: String,
    },

    /// Browse the activity log
    Logs(LogArgs),

    /// Interactive debounced search; one query per line on stdin
    Search {
        #[arg(value_enum)]
        target: SearchTarget,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScheduleView {
    Day,
    Week,
    Month,
}

impl From<ScheduleView> for ViewKind {
    fn from(view: ScheduleView) -> Self {
        match view {
            ScheduleView::Day => ViewKind::Day,
            ScheduleView::Week => ViewKind::Week,
            ScheduleView::Month => ViewKind::Month,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SearchTarget {
    Customers,
    Vehicles,
}

#[derive(Args, Clone, Debug)]
pub struct ListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 10)]
    pub limit: u32,

    #[arg(long, short = 's', default_value = "")]
    pub search: String,
}

#[derive(Subcommand)]
pub enum VehicleCommand {
    List(ListArgs),
    Add(VehicleArgs),
    Update {
        id: String,
        #[command(flatten)]
        fields: VehicleArgs,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Clone, Debug)]
pub struct VehicleArgs {
    #[arg(long)]
    pub plate: String,

    #[arg(long = "type", default_value = "")]
    pub vehicle_type: String,

    #[arg(long, default_value = "")]
    pub brand: String,

    /// Daily price in VND
    #[arg(long)]
    pub price: f64,

    #[arg(long, default_value_t = VehicleStatus::Available)]
    pub status: VehicleStatus,

    #[arg(long)]
    pub color: Option<String>,

    #[arg(long)]
    pub year: Option<i32>,

    /// Image files to upload (repeatable)
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,
}

#[derive(Subcommand)]
pub enum CustomerCommand {
    List(ListArgs),
    Add(CustomerArgs),
    Update {
        id: String,
        #[command(flatten)]
        fields: CustomerArgs,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Clone, Debug)]
pub struct CustomerArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// National ID number
    #[arg(long)]
    pub cccd: Option<String>,

    #[arg(long)]
    pub driver_license: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Photo of the national ID card
    #[arg(long)]
    pub cccd_image: Option<PathBuf>,

    #[arg(long)]
    pub driver_license_image: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum BookingCommand {
    /// List bookings, optionally filtered by customer, plate or brand
    List {
        #[arg(long, short = 's', default_value = "")]
        search: String,
    },

    /// Show the price a booking would get without submitting it
    Quote(DraftArgs),

    Create(DraftArgs),

    /// Edit an existing booking; unset fields keep their current value
    Update {
        id: String,
        #[command(flatten)]
        draft: DraftArgs,

        #[arg(long)]
        status: Option<BookingStatus>,
    },

    Delete {
        id: String,
    },
}

#[derive(Args, Clone, Debug, Default)]
pub struct DraftArgs {
    /// Customer id
    #[arg(long)]
    pub customer: Option<String>,

    /// Vehicle id (repeatable)
    #[arg(long = "vehicle")]
    pub vehicles: Vec<String>,

    /// Local start time, e.g. 2024-06-01T09:00
    #[arg(long, conflicts_with = "start_now")]
    pub start: Option<String>,

    /// Start at the next quarter hour
    #[arg(long)]
    pub start_now: bool,

    #[arg(long, conflicts_with = "days")]
    pub end: Option<String>,

    /// End this many days after the start
    #[arg(long)]
    pub days: Option<i64>,

    /// Override the computed total (VND)
    #[arg(long)]
    pub total: Option<f64>,

    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct LogArgs {
    #[arg(long)]
    pub actor: Option<String>,

    #[arg(long)]
    pub action: Option<String>,

    #[arg(long)]
    pub entity: Option<String>,

    #[arg(long)]
    pub status: Option<LogStatus>,

    /// RFC 3339 lower bound
    #[arg(long)]
    pub from: Option<chrono::DateTime<chrono::Utc>>,

    #[arg(long)]
    pub to: Option<chrono::DateTime<chrono::Utc>>,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Page through interactively (n/p/q on stdin)
    #[arg(long, short = 'i')]
    pub interactive: bool,
}
