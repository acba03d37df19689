//! wallet_client - interactive wallet shell
//!
//! One process is one "page": the session lives in memory, every entered
//! line counts as user activity, and closing the shell tears the session
//! down.
//!
//! ```text
//! stdin line ──► KeyPress ──► InactivityMonitor
//!            └─► ShellCommand ──► AuthService / MoneyMovementOrchestrator
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use wallet_client::flows::MobileMoneyDirection;
use wallet_client::logging::init_logging;
use wallet_client::{
    ActivityHandle, ActivitySignal, ApiGateway, AppConfig, AuthService, ConfirmPrompt, Confirmer,
    DepositFlow, FlowError, FormHandle, InactivityMonitor, MobileMoneyFlow,
    MoneyMovementOrchestrator, Navigator, ProfileSync, RegisterForm, Route, SessionLifecycle,
    SessionStore, SubmitOutcome, TransferFlow, WalletApi, WithdrawFlow,
};

type SharedLines = Arc<Mutex<Lines<BufReader<Stdin>>>>;

#[derive(Parser, Debug)]
#[command(name = "wallet_client")]
#[command(about = "Multi-currency wallet client shell")]
#[command(version = env!("WALLET_BUILD_ID"))]
struct Cli {
    /// Config environment, loads config/<env>.yaml
    #[arg(short, long, default_value = "dev", env = "WALLET_ENV")]
    env: String,

    /// Override the API base URL from the config
    #[arg(long, env = "WALLET_BASE_URL")]
    base_url: Option<String>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Create an account
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        mobile: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        /// Wallet currency (defaults to the configured one)
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        pin: Option<String>,
        #[arg(long)]
        confirm_pin: Option<String>,
    },

    /// List supported wallet currencies
    Currencies,

    /// Request an OTP for a username or email
    Login {
        username_or_email: String,
        password: String,
    },

    /// Complete login with the emailed OTP
    Otp { code: String },

    /// Refetch and show balance
    Profile,

    /// Show recent transactions
    History {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Deposit into the wallet
    Deposit {
        amount: String,
        #[arg(long)]
        pin: Option<String>,
    },

    /// Quote a converted amount without moving money
    Preview {
        amount: String,
        currency: Option<String>,
    },

    /// Withdraw to an email with conversion
    Withdraw {
        amount: String,
        receiver_email: String,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        pin: Option<String>,
    },

    /// Send money to a username or email
    Send {
        recipient: String,
        amount: String,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        pin: Option<String>,
    },

    /// Start an M-Pesa STK push
    MpesaDeposit { phone: String, amount: String },

    /// Withdraw to an M-Pesa number
    MpesaWithdraw {
        phone: String,
        amount: String,
        #[arg(long)]
        pin: Option<String>,
    },

    /// Change the wallet's base currency
    SetCurrency { code: String },

    /// Pick the shared target currency (shared scope only)
    Select { code: String },

    /// End the session
    Logout,

    /// Simulate the page going to the background
    Hide,

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// Navigation for a terminal: just tell the user where they are.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        match route {
            Route::Login => println!("\n[{}] Please log in.", route),
            Route::VerifyOtp => println!("[{}] Enter the OTP with `otp <code>`.", route),
            Route::Wallet => println!("[{}] Logged in.", route),
            Route::Register => println!("[{}]", route),
        }
    }
}

/// Confirmation prompts answered on stdin.
struct StdinConfirmer {
    lines: SharedLines,
    activity: ActivityHandle,
    assume_yes: bool,
}

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        println!("{}", prompt.message());
        if self.assume_yes {
            println!("(confirmed by --yes)");
            return true;
        }
        print!("Confirm? [y/N] ");
        let _ = std::io::stdout().flush();

        let answer = self.lines.lock().await.next_line().await;
        self.activity.notify(ActivitySignal::KeyPress);
        match answer {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

struct Shell {
    config: AppConfig,
    auth: AuthService,
    orchestrator: MoneyMovementOrchestrator,
    confirmer: StdinConfirmer,
    monitor: InactivityMonitor,
    deposit: FormHandle<DepositFlow>,
    withdraw: FormHandle<WithdrawFlow>,
    transfer: FormHandle<TransferFlow>,
    mpesa_in: FormHandle<MobileMoneyFlow>,
    mpesa_out: FormHandle<MobileMoneyFlow>,
}

impl Shell {
    /// Returns `false` when the shell should exit.
    async fn dispatch(&self, command: ShellCommand) -> bool {
        match command {
            ShellCommand::Register {
                first_name,
                last_name,
                username,
                email,
                mobile,
                password,
                confirm_password,
                currency,
                pin,
                confirm_pin,
            } => {
                let form = RegisterForm {
                    first_name,
                    last_name,
                    username,
                    email,
                    mobile,
                    password,
                    confirm_password,
                    currency: currency.unwrap_or_else(|| self.config.flows.default_currency.clone()),
                    pin: pin.unwrap_or_default(),
                    confirm_pin: confirm_pin.unwrap_or_default(),
                };
                show(self.auth.register(&form).await);
            }
            ShellCommand::Currencies => {
                for c in self.auth.currencies().await {
                    println!("  {} - {}", c.code, c.name);
                }
            }
            ShellCommand::Login {
                username_or_email,
                password,
            } => show(self.auth.login(&username_or_email, &password).await),
            ShellCommand::Otp { code } => {
                let verified = self.auth.verify_otp(&code).await;
                let ok = verified.is_ok();
                show(verified);
                if ok {
                    self.print_profile().await;
                }
            }
            ShellCommand::Profile => self.print_profile().await,
            ShellCommand::History { limit } => self.print_history(limit),
            ShellCommand::Deposit { amount, pin } => {
                self.deposit.edit(|f| {
                    f.set_amount(&amount);
                    f.set_pin(pin.as_deref().unwrap_or(""));
                });
                self.report(self.orchestrator.deposit(&self.deposit).await);
            }
            ShellCommand::Preview { amount, currency } => {
                self.transfer.edit(|f| {
                    f.set_amount(&amount);
                    f.set_currency(currency.as_deref().unwrap_or(""));
                });
                match self.orchestrator.preview_transfer(&self.transfer).await {
                    Ok(Some(quote)) => println!("{}", quote.describe()),
                    Ok(None) => println!("A request is already in progress."),
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            ShellCommand::Withdraw {
                amount,
                receiver_email,
                currency,
                pin,
            } => {
                self.withdraw.edit(|f| {
                    f.set_amount(&amount);
                    f.set_currency(currency.as_deref().unwrap_or(""));
                    f.set_receiver_email(&receiver_email);
                    f.set_pin(pin.as_deref().unwrap_or(""));
                });
                self.report(
                    self.orchestrator
                        .submit_withdrawal(&self.withdraw, &self.confirmer)
                        .await,
                );
            }
            ShellCommand::Send {
                recipient,
                amount,
                currency,
                pin,
            } => {
                self.transfer.edit(|f| {
                    f.set_recipient(&recipient);
                    f.set_amount(&amount);
                    f.set_currency(currency.as_deref().unwrap_or(""));
                    f.set_pin(pin.as_deref().unwrap_or(""));
                });
                self.report(
                    self.orchestrator
                        .transfer(&self.transfer, &self.confirmer)
                        .await,
                );
            }
            ShellCommand::MpesaDeposit { phone, amount } => {
                self.mpesa_in.edit(|f| {
                    f.set_phone(&phone);
                    f.set_amount(&amount);
                });
                self.report(self.orchestrator.mobile_money(&self.mpesa_in).await);
            }
            ShellCommand::MpesaWithdraw { phone, amount, pin } => {
                self.mpesa_out.edit(|f| {
                    f.set_phone(&phone);
                    f.set_amount(&amount);
                    f.set_pin(pin.as_deref().unwrap_or(""));
                });
                self.report(self.orchestrator.mobile_money(&self.mpesa_out).await);
            }
            ShellCommand::SetCurrency { code } => {
                match self.orchestrator.update_currency(&code).await {
                    Ok(code) => {
                        println!("Wallet currency is now {}.", code);
                        self.print_balance();
                    }
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            ShellCommand::Select { code } => match self.orchestrator.select_currency(&code) {
                Ok(code) => println!("Target currency: {}", code),
                Err(e) => println!("{}", e),
            },
            ShellCommand::Logout => self.auth.logout(),
            ShellCommand::Hide => {
                self.monitor.notify(ActivitySignal::PageHidden);
                tokio::task::yield_now().await;
                println!("Page hidden: session cleared.");
            }
            ShellCommand::Quit => {
                self.monitor.notify(ActivitySignal::BeforeUnload);
                tokio::task::yield_now().await;
                return false;
            }
        }
        true
    }

    fn report(&self, result: Result<SubmitOutcome, FlowError>) {
        match result {
            Ok(SubmitOutcome::Settled { message, .. }) => {
                println!("{}", message);
                self.print_balance();
            }
            Ok(SubmitOutcome::Dispatched { message }) => {
                println!("{}", message);
                println!(
                    "Balance will refresh in {}s.",
                    self.config.flows.mobile_money_resync_delay_secs
                );
            }
            Ok(SubmitOutcome::AlreadyInFlight) => println!("A request is already in progress."),
            Ok(SubmitOutcome::Declined) => println!("Cancelled."),
            Err(e) => println!("{}", e.user_message()),
        }
    }

    async fn print_profile(&self) {
        match self.orchestrator.sync().refresh().await {
            Ok(profile) => {
                println!(
                    "Hello {}!",
                    profile.first_name.as_deref().unwrap_or(&profile.username)
                );
                self.print_balance();
            }
            Err(e) => println!("{}", e.user_message()),
        }
    }

    fn print_balance(&self) {
        if let Some(line) = self.orchestrator.sync().snapshot().balance_line() {
            println!("Balance: {}", line);
        }
    }

    fn print_history(&self, limit: usize) {
        let state = self.orchestrator.sync().snapshot();
        if state.transactions().is_empty() {
            println!("No transactions.");
            return;
        }
        for tx in state.transactions().iter().take(limit) {
            println!(
                "  {}  {:<12} {:>12} {:<4} {} {}",
                tx.timestamp.format("%Y-%m-%d %H:%M"),
                tx.kind,
                tx.amount.to_string(),
                tx.currency.as_ref().map(|c| c.as_str()).unwrap_or(""),
                tx.counterparty.as_deref().unwrap_or(""),
                tx.description.as_deref().unwrap_or("")
            );
        }
    }
}

fn show(result: Result<String, FlowError>) {
    match result {
        Ok(message) => println!("{}", message),
        Err(e) => println!("{}", e.user_message()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        AppConfig::load(&cli.env).with_context(|| format!("loading config for {}", cli.env))?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    let _log_guard = init_logging(&config);
    tracing::info!(
        env = %cli.env,
        base_url = %config.api.base_url,
        build = env!("WALLET_BUILD_ID"),
        "wallet_client starting"
    );

    let session = SessionStore::page_scoped();
    let lifecycle = SessionLifecycle::new(session.clone(), Arc::new(ConsoleNavigator));
    let api: Arc<dyn WalletApi> = Arc::new(
        ApiGateway::new(&config.api, session).context("building HTTP client")?,
    );
    let sync = ProfileSync::new(api.clone(), lifecycle.clone());
    let orchestrator =
        MoneyMovementOrchestrator::new(api.clone(), sync, lifecycle.clone(), config.flows.clone());
    let auth = AuthService::new(api, lifecycle.clone());
    let monitor = InactivityMonitor::arm(lifecycle, config.session.idle_timeout())
        .context("arming inactivity monitor")?;

    let lines: SharedLines = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let shell = Shell {
        confirmer: StdinConfirmer {
            lines: lines.clone(),
            activity: monitor.handle(),
            assume_yes: cli.yes,
        },
        auth,
        orchestrator,
        monitor,
        deposit: FormHandle::new(DepositFlow::new()),
        withdraw: FormHandle::new(WithdrawFlow::new()),
        transfer: FormHandle::new(TransferFlow::new()),
        mpesa_in: FormHandle::new(MobileMoneyFlow::new(MobileMoneyDirection::Deposit)),
        mpesa_out: FormHandle::new(MobileMoneyFlow::new(MobileMoneyDirection::Withdraw)),
        config,
    };

    println!("wallet_client {} - type `help` for commands", env!("WALLET_BUILD_ID"));
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = lines.lock().await.next_line().await?;
        let Some(line) = line else {
            shell.monitor.notify(ActivitySignal::BeforeUnload);
            break;
        };
        shell.monitor.notify(ActivitySignal::KeyPress);

        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        match ShellLine::try_parse_from(words) {
            Ok(parsed) => {
                if !shell.dispatch(parsed.command).await {
                    break;
                }
            }
            Err(e) => println!("{}", e),
        }
    }

    tracing::info!("wallet_client exiting");
    Ok(())
}
