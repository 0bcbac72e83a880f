use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ledger::account::{
    derive_page, derive_record, sort_derived, sum_page, sum_selected, Classifier, EntityKind,
    PaymentCategory, RecordId,
};
use ledger::api::{
    LedgerClient, ListQuery, NewAccount, NewBill, NewPayment, Page, SortDirection, SortField,
    SortSpec,
};
use ledger::config::{config_dir, config_file, init_config_dir, load_config, Config, SelectionStore};
use ledger::error::{LedgerError, Result};
use ledger::render::{accounts_table, format_money, page_line, payments_table, totals_table};

#[derive(Parser)]
#[command(name = "ledger")]
#[command(version, about = "Customer, supplier and transport ledger client", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.ledger or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log requests and selection changes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Show config and stored selections
    Status,

    /// List a page of accounts with derived totals
    List {
        #[arg(value_enum)]
        kind: EntityKind,

        #[command(flatten)]
        filters: ListArgs,
    },

    /// Show one account with its payment history
    Show {
        #[arg(value_enum)]
        kind: EntityKind,

        id: String,
    },

    /// Create a new account
    Create {
        #[arg(value_enum)]
        kind: EntityKind,

        #[arg(long)]
        name: String,

        /// Opening billed amount
        #[arg(long, default_value_t = 0.0)]
        billed: f64,
    },

    /// Record a payment against an account
    Pay {
        #[arg(value_enum)]
        kind: EntityKind,

        id: String,

        amount: f64,

        /// Payment date (default: today)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        method: Option<String>,

        #[arg(long)]
        remark: Option<String>,

        /// Bucket for this payment
        #[arg(long, value_enum)]
        category: Option<PaymentCategory>,
    },

    /// Record a bill against an account
    Bill {
        #[arg(value_enum)]
        kind: EntityKind,

        id: String,

        amount: f64,

        /// Bill date (default: today)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        remark: Option<String>,
    },

    /// Delete an account (admin only)
    Delete {
        #[arg(value_enum)]
        kind: EntityKind,

        id: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Manage which rows count toward the SELECTED totals
    Select {
        #[arg(value_enum)]
        kind: EntityKind,

        #[command(subcommand)]
        action: SelectAction,
    },
}

#[derive(Subcommand)]
enum SelectAction {
    /// Flip one or more rows
    Toggle {
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        filters: ListArgs,
    },

    /// Select the given rows, or every row on the page when none are given
    All {
        ids: Vec<String>,

        #[command(flatten)]
        filters: ListArgs,
    },

    /// Deselect every row
    Clear,

    /// Forget the stored selection (all visible rows count again)
    Reset,

    /// Print the stored selection
    Show,
}

#[derive(Args, Clone)]
struct ListArgs {
    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Rows per page (default: display.page_size)
    #[arg(long)]
    page_size: Option<usize>,

    /// Free-text search
    #[arg(long)]
    search: Option<String>,

    /// Categorical filter passed through to the server
    #[arg(long)]
    category: Option<String>,

    /// Minimum amount
    #[arg(long)]
    min: Option<f64>,

    /// Maximum amount
    #[arg(long)]
    max: Option<f64>,

    /// Filter from this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Filter to this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,

    /// Sort field
    #[arg(long, value_enum)]
    sort: Option<SortField>,

    /// Sort descending
    #[arg(long)]
    desc: bool,

    /// Re-sort the fetched page on locally derived figures
    #[arg(long, requires = "sort")]
    local_sort: bool,
}

impl ListArgs {
    fn to_query(&self, default_page_size: usize) -> Result<ListQuery> {
        Ok(ListQuery {
            page: self.page,
            page_size: self.page_size.unwrap_or(default_page_size),
            search: self.search.clone(),
            category: self.category.clone(),
            min_amount: self.min,
            max_amount: self.max,
            from: self.from.as_deref().map(parse_date).transpose()?,
            to: self.to.as_deref().map(parse_date).transpose()?,
            sort: self.sort_spec(),
        })
    }

    fn sort_spec(&self) -> Option<SortSpec> {
        self.sort.map(|field| SortSpec {
            field,
            direction: if self.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        })
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("LEDGER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::List { kind, filters } => cmd_list(&cfg_dir, kind, &filters),
        Commands::Show { kind, id } => cmd_show(&cfg_dir, kind, &id),
        Commands::Create { kind, name, billed } => cmd_create(&cfg_dir, kind, name, billed),
        Commands::Pay {
            kind,
            id,
            amount,
            date,
            method,
            remark,
            category,
        } => {
            let payment = NewPayment {
                amount,
                date: date_or_today(date.as_deref())?,
                method,
                remark,
                category,
            };
            cmd_pay(&cfg_dir, kind, &id, &payment)
        }
        Commands::Bill {
            kind,
            id,
            amount,
            date,
            remark,
        } => {
            let bill = NewBill {
                amount,
                date: date_or_today(date.as_deref())?,
                remark,
            };
            cmd_bill(&cfg_dir, kind, &id, &bill)
        }
        Commands::Delete { kind, id, yes } => cmd_delete(&cfg_dir, kind, &id, yes),
        Commands::Select { kind, action } => cmd_select(&cfg_dir, kind, action),
    }
}

fn parse_date(raw: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| LedgerError::InvalidDate(raw.to_string()))
}

fn date_or_today(raw: Option<&str>) -> Result<chrono::NaiveDate> {
    match raw {
        Some(s) => parse_date(s),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn ensure_initialized(cfg_dir: &Path) -> Result<Config> {
    if !cfg_dir.exists() {
        return Err(LedgerError::ConfigNotFound(cfg_dir.to_path_buf()));
    }
    load_config(cfg_dir)
}

/// Validate the filters, then fetch one page. Only failures of the fetch
/// itself are reported as a load failure.
fn fetch_page(config: &Config, kind: EntityKind, query: &ListQuery) -> Result<Page> {
    let query = query.validate()?;
    let client = LedgerClient::from_settings(&config.api);
    client
        .list(kind, &query)
        .map_err(|e| LedgerError::FetchFailed {
            kind: kind.to_string(),
            message: e.to_string(),
        })
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    init_config_dir(cfg_dir)?;

    println!("Initialized ledger config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point the client at your server:  $EDITOR {}",
        config_file(cfg_dir).display()
    );
    println!("  2. List accounts:                    ledger list customer");

    Ok(())
}

fn cmd_status(cfg_dir: &Path) -> Result<()> {
    let config = ensure_initialized(cfg_dir)?;
    let store = SelectionStore::open(cfg_dir)?;

    println!("Ledger Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("API:              {}", config.api.base_url);
    println!("Role:             {}", config.user.role);
    println!("Page size:        {}", config.display.page_size);
    println!();
    println!("Selections:");
    for kind in EntityKind::ALL {
        match store.stored(kind) {
            Some(ids) => println!("  {:<10} {} selected", kind, ids.len()),
            None => println!("  {:<10} all visible (default)", kind),
        }
    }

    Ok(())
}

fn cmd_list(cfg_dir: &Path, kind: EntityKind, filters: &ListArgs) -> Result<()> {
    let config = ensure_initialized(cfg_dir)?;
    let query = filters.to_query(config.display.page_size)?.validate()?;
    let page = fetch_page(&config, kind, &query)?;
    let sym = &config.display.currency_symbol;

    if page.is_empty() {
        println!("No {kind} accounts match the current filters.");
        println!("{}", page_line(query.page, query.page_size, page.total_count));
        return Ok(());
    }

    let store = SelectionStore::open(cfg_dir)?;
    let selected = store.restore(kind, &page.ids());

    let mut derived = derive_page(&page.items, &Classifier::default());
    if filters.local_sort {
        if let Some(spec) = filters.sort_spec() {
            sort_derived(&mut derived, spec);
        }
    }

    let offset = (query.page as usize - 1) * query.page_size;
    println!("{}", accounts_table(&derived, &selected, offset, sym));
    println!(
        "{}",
        totals_table(
            &page,
            &sum_page(&derived),
            &sum_selected(&derived, &selected),
            sym
        )
    );
    println!("{}", page_line(query.page, query.page_size, page.total_count));

    Ok(())
}

fn cmd_show(cfg_dir: &Path, kind: EntityKind, id: &str) -> Result<()> {
    let config = ensure_initialized(cfg_dir)?;
    let client = LedgerClient::from_settings(&config.api);
    let record = client.get(kind, &RecordId::from(id))?;
    let classifier = Classifier::default();
    let derived = derive_record(&record, &classifier);
    let sym = &config.display.currency_symbol;

    println!("{} {} - {}", kind, derived.id, derived.name);
    if record.payments.is_empty() {
        println!("  No payments recorded.");
    } else {
        println!("{}", payments_table(&record, &classifier, sym));
    }
    println!("  Billed:    {}", format_money(derived.billed, sym));
    println!("  Paid:      {}", format_money(derived.paid, sym));
    println!("  Pending:   {}", format_money(derived.pending, sym));
    println!(
        "  Bill part: {}   Cash part: {}   Unclassified payments: {}",
        format_money(derived.bill_part, sym),
        format_money(derived.cash_part, sym),
        derived.unclassified
    );

    Ok(())
}

fn cmd_create(cfg_dir: &Path, kind: EntityKind, name: String, billed: f64) -> Result<()> {
    let config = ensure_initialized(cfg_dir)?;
    let client = LedgerClient::from_settings(&config.api);
    let record = client.create(
        kind,
        &NewAccount {
            name,
            billed_amount: billed,
        },
    )?;

    println!("Created {} account {} ({})", kind, record.id, record.name);
    Ok(())
}

fn cmd_pay(cfg_dir: &Path, kind: EntityKind, id: &str, payment: &NewPayment) -> Result<()> {
    let config = ensure_initialized(cfg_dir)?;
    let client = LedgerClient::from_settings(&config.api);
    let record = client.add_payment(kind, &RecordId::from(id), payment)?;
    let sym = &config.display.currency_symbol;

    println!(
        "Recorded {} payment for {} ({} pending)",
        format_money(payment.amount, sym),
        record.id,
        format_money(record.pending_amount(), sym)
    );
    Ok(())
}

fn cmd_bill(cfg_dir: &Path, kind: EntityKind, id: &str, bill: &NewBill) -> Result<()> {
    let config = ensure_initialized(cfg_dir)?;
    let client = LedgerClient::from_settings(&config.api);
    let record = client.add_bill(kind, &RecordId::from(id), bill)?;
    let sym = &config.display.currency_symbol;

    println!(
        "Recorded {} bill for {} ({} pending)",
        format_money(bill.amount, sym),
        record.id,
        format_money(record.pending_amount(), sym)
    );
    Ok(())
}

fn cmd_delete(cfg_dir: &Path, kind: EntityKind, id: &str, yes: bool) -> Result<()> {
    let config = ensure_initialized(cfg_dir)?;
    if !yes {
        return Err(LedgerError::DeleteNotConfirmed(format!("{kind} {id}")));
    }
    let client = LedgerClient::from_settings(&config.api);
    let record_id = RecordId::from(id);
    client.delete(kind, &record_id, config.user.role)?;

    // A deleted row must not linger in the stored selection.
    let mut store = SelectionStore::open(cfg_dir)?;
    if store.stored(kind).is_some_and(|ids| ids.contains(&record_id)) {
        store.toggle(kind, record_id, &[])?;
    }

    println!("Deleted {kind} account {id}");
    Ok(())
}

fn cmd_select(cfg_dir: &Path, kind: EntityKind, action: SelectAction) -> Result<()> {
    let config = ensure_initialized(cfg_dir)?;
    let mut store = SelectionStore::open(cfg_dir)?;

    match action {
        SelectAction::Toggle { ids, filters } => {
            // Only the default selection depends on what is visible.
            let visible = if store.stored(kind).is_none() {
                let query = filters.to_query(config.display.page_size)?;
                fetch_page(&config, kind, &query)?.ids()
            } else {
                Vec::new()
            };
            for id in ids {
                let now = store.toggle(kind, RecordId::from(id.as_str()), &visible)?;
                println!(
                    "{} {}",
                    if now { "Selected" } else { "Deselected" },
                    id
                );
            }
        }
        SelectAction::All { ids, filters } => {
            let ids: Vec<RecordId> = if ids.is_empty() {
                let query = filters.to_query(config.display.page_size)?;
                fetch_page(&config, kind, &query)?.ids()
            } else {
                ids.iter().map(|id| RecordId::from(id.as_str())).collect()
            };
            store.select_all(kind, &ids)?;
            println!("Selected {} {} account(s)", ids.len(), kind);
        }
        SelectAction::Clear => {
            store.clear(kind)?;
            println!("Cleared {kind} selection");
        }
        SelectAction::Reset => {
            store.reset(kind)?;
            println!("Reset {kind} selection; all visible rows count toward totals");
        }
        SelectAction::Show => match store.stored(kind) {
            Some(ids) if ids.is_empty() => println!("No {kind} accounts selected."),
            Some(ids) => {
                for id in ids {
                    println!("{id}");
                }
            }
            None => println!("No stored {kind} selection; all visible rows count toward totals."),
        },
    }

    Ok(())
}
