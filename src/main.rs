use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use comfy_table::{modifiers, presets, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use terminal_size::{terminal_size, Width};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use sgwiz::api::{GateClient, ImageQuery};
use sgwiz::config::{self, DEFAULT_WIZARD_TITLE};
use sgwiz::models::{Application, Image, ServerGroupCommand, ServiceAccount};
use sgwiz::tasks::MonitorStatus;
use sgwiz::wizard::{LoadStatus, Resource, Screen, StateListener, Submission, WizardState};
use sgwiz::{Result, ServerGroupWizard, WizardError, WizardProps, WizardServices};

#[derive(Parser)]
#[command(
    name = "sgwiz",
    author,
    version,
    about = "Create and clone yandex server groups",
    long_about = r#"sgwiz walks a server group command through the creation wizard.

It loads service accounts and images for the selected account, validates every
wizard page and then either prints the finished command (pipeline modes) or
starts the create/clone task and follows it until it settles.

Examples:
  sgwiz create --command-file server-group.json --account yc-prod
  sgwiz images --account yc-prod
  sgwiz check-config
"#,
    after_help = "Use `sgwiz <subcommand> --help` to get subcommand specific options."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Disable colorized output
    #[arg(long, global = true)]
    no_color: bool,
    /// Disable request/response logging
    #[arg(long, global = true)]
    silent: bool,
    /// Path to .env file
    #[arg(long, global = true)]
    env_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a server group command through the wizard and submit it
    Create {
        /// JSON file holding the server group command
        #[arg(long)]
        command_file: PathBuf,
        /// Account to load reference data for (defaults to the command's credentials)
        #[arg(long)]
        account: Option<String>,
        /// Application name (overrides the command and SGWIZ_APPLICATION)
        #[arg(long)]
        application: Option<String>,
        /// Wizard heading
        #[arg(long, default_value_t = String::from(DEFAULT_WIZARD_TITLE))]
        title: String,
    },
    /// List service accounts available to an account
    ServiceAccounts {
        #[arg(long)]
        account: String,
    },
    /// List images available to an account
    Images {
        #[arg(long)]
        account: String,
    },
    /// Print the effective configuration
    CheckConfig,
}

/// Keeps a spinner in sync with the wizard's loading state
struct SpinnerListener {
    bar: ProgressBar,
}

fn describe<T>(resource: &Resource<T>) -> String {
    match resource.status() {
        LoadStatus::Idle => "idle".to_string(),
        LoadStatus::Loading => "loading".to_string(),
        LoadStatus::Loaded => format!("{} loaded", resource.data().map_or(0, |d| d.len())),
        LoadStatus::Failed(message) => format!("failed ({})", message),
    }
}

impl StateListener for SpinnerListener {
    fn state_changed(&self, state: &WizardState) {
        self.bar.set_message(format!(
            "service accounts: {}, images: {}",
            describe(&state.service_accounts),
            describe(&state.images)
        ));
    }

    fn force_update(&self) {
        self.bar.tick();
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    if rows.is_empty() {
        println!("(empty list)");
        return;
    }
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    if let Some((Width(w), _)) = terminal_size() {
        table.set_width(w.saturating_sub(4));
    }
    table.set_header(headers);
    for row in rows {
        table.add_row(row);
    }
    println!("\n{table}\n");
}

fn print_service_accounts(accounts: &[ServiceAccount]) {
    let rows = accounts
        .iter()
        .map(|a| {
            vec![
                a.id.clone(),
                a.name.clone(),
                a.folder_id.clone().unwrap_or_default(),
                a.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["ID", "Name", "Folder", "Description"], rows);
}

fn print_images(images: &[Image]) {
    let rows = images
        .iter()
        .map(|i| {
            vec![
                i.id.clone(),
                i.name.clone(),
                i.family.clone().unwrap_or_default(),
                i.created_at_display(),
            ]
        })
        .collect();
    print_table(&["ID", "Name", "Family", "Created"], rows);
}

async fn read_command(path: &PathBuf, application: Option<String>) -> Result<ServerGroupCommand> {
    let raw = tokio::fs::read_to_string(path).await?;
    let mut command: ServerGroupCommand = serde_json::from_str(&raw)?;
    if let Some(app) = application.or_else(config::get_default_application) {
        command.application = app;
    }
    if command.application.trim().is_empty() {
        return Err(WizardError::invalid_command(
            "application is required (set it in the command file, pass --application or set SGWIZ_APPLICATION)",
        ));
    }
    Ok(command)
}

async fn follow_task(wizard: &ServerGroupWizard, submission: Submission) -> Result<()> {
    let Submission::TaskStarted(monitor) = submission else {
        return Ok(());
    };
    let bar = spinner(monitor.title());
    let mut rx = monitor.subscribe();
    loop {
        let status = rx.borrow_and_update().clone();
        bar.set_message(format!("{}: {}", monitor.title(), status));
        if status.is_settled() || rx.changed().await.is_err() {
            break;
        }
    }
    bar.finish_and_clear();

    match monitor.status() {
        MonitorStatus::Succeeded { task_id } => {
            println!(
                "{} {}",
                yansi::Paint::new("Server group task succeeded:").green().bold(),
                task_id
            );
            let groups = wizard.application().server_groups();
            let rows = groups
                .iter()
                .map(|g| {
                    vec![
                        g.name.clone(),
                        g.account.clone(),
                        g.region.clone(),
                        if g.is_disabled { "disabled" } else { "enabled" }.to_string(),
                    ]
                })
                .collect();
            print_table(&["Server group", "Account", "Region", "State"], rows);
            Ok(())
        }
        MonitorStatus::Failed { message, .. } => Err(WizardError::TaskFailed(message)),
        other => {
            println!("{} {}", yansi::Paint::new("Task stopped:").yellow(), other);
            Ok(())
        }
    }
}

async fn run_create(
    command_file: PathBuf,
    account: Option<String>,
    application: Option<String>,
    title: String,
) -> Result<()> {
    let command = read_command(&command_file, application).await?;
    let client = GateClient::from_env()?;
    let services = WizardServices::gate(client.clone(), config::get_poll_interval());
    let app = Application::new(command.application.clone(), Arc::new(client));

    let bar = spinner("Preparing wizard");
    let props = WizardProps::new(app, command, title)
        .with_listener(Arc::new(SpinnerListener { bar: bar.clone() }));
    let (mut wizard, result) = ServerGroupWizard::show(props, services);

    if let Screen::TemplateSelection { .. } = wizard.screen() {
        bar.println("Template selection requested; using the supplied command as the template");
        wizard.template_selected();
    }

    let account = account
        .or_else(|| wizard.command().account.clone())
        .ok_or_else(|| WizardError::invalid_command("no account given (use --account or set credentials)"))?;
    wizard.account_changed(&account);
    wizard.settle().await;
    bar.finish_and_clear();

    let state = wizard.state();
    for (label, error) in [
        ("service accounts", state.service_accounts.error()),
        ("images", state.images.error()),
    ] {
        if let Some(error) = error {
            eprintln!("{} {}: {}", yansi::Paint::new("Failed to load").yellow(), label, error);
        }
    }
    if let Some(accounts) = state.service_accounts() {
        print_service_accounts(accounts);
    }
    if let Some(images) = state.all_images() {
        print_images(images);
    }

    let command = wizard.command().clone();
    let submission = wizard.submit(command)?;
    if matches!(submission, Submission::ReturnedToCaller) {
        let finished = result.wait().await?;
        println!("{}", serde_json::to_string_pretty(&finished)?);
    } else {
        follow_task(&wizard, submission).await?;
    }
    wizard.unmount();
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    config::load_env_file(cli.env_file.as_deref());
    match cli.command {
        Commands::Create {
            command_file,
            account,
            application,
            title,
        } => run_create(command_file, account, application, title).await,
        Commands::ServiceAccounts { account } => {
            let client = GateClient::from_env()?;
            let accounts = client.load_service_accounts(&account).await?;
            print_service_accounts(&accounts);
            Ok(())
        }
        Commands::Images { account } => {
            let client = GateClient::from_env()?;
            let images = client.find_images(&ImageQuery::for_account(&account)).await?;
            print_images(&images);
            Ok(())
        }
        Commands::CheckConfig => {
            let token = config::get_gate_token();
            let rows = vec![
                vec!["GATE_BASE_URL".to_string(), config::get_gate_base_url()],
                vec![
                    "GATE_TOKEN".to_string(),
                    if token.is_empty() { "(not set)".to_string() } else { "(set)".to_string() },
                ],
                vec![
                    "SGWIZ_POLL_INTERVAL_MS".to_string(),
                    config::get_poll_interval().as_millis().to_string(),
                ],
                vec![
                    "SGWIZ_APPLICATION".to_string(),
                    config::get_default_application().unwrap_or_else(|| "(not set)".to_string()),
                ],
                vec!["provider".to_string(), config::PROVIDER.to_string()],
            ];
            print_table(&["Field", "Value"], rows);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sgwiz=info")))
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        yansi::whenever(yansi::Condition::NEVER);
    }

    if cli.silent {
        sgwiz::api::set_silent(true);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(%e, "Command failed");
        eprintln!("{}: {}", yansi::Paint::new("Error").red().bold(), e);
        process::exit(1);
    }
}
