use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;
use voltdesk_api::{BillingApi, HttpBillingApi};
use voltdesk_core::{
    AmountInput, AssetBalance, CheckErrorPolicy, LookupKind, LookupQuery, LookupResult,
    MIN_LOOKUP_LEN, PollSettings, SessionStatus, TransferDraft,
};
use voltdesk_flow::{
    ConfirmationPoller, Debouncer, FlowContext, FlowError, LookupConfig, LookupState,
    MemoryClipboard, Notice, OtpConfig, PollTrigger, PresenterConfig, TokenPresenter,
    TransferFlow, TransferStage,
};

mod display;

#[derive(Parser, Debug)]
#[command(name = "voltdesk", version, about = "Utility billing back-office console")]
struct Cli {
    #[arg(long, env = "VOLTDESK_API_URL", help = "Billing API base URL")]
    api_url: String,
    #[arg(
        long,
        env = "VOLTDESK_API_TOKEN",
        hide_env_values = true,
        help = "Bearer token for the billing API"
    )]
    api_token: Option<String>,
    #[arg(long, env = "VOLTDESK_HTTP_TIMEOUT_SECS", default_value_t = 15)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Look up one customer by account tag, meter number, or account reference.
    Lookup { kind: LookupKind, value: String },
    /// Search as you type: each stdin line is the current field text.
    Search { kind: LookupKind },
    /// Wait for a payment to be confirmed and show the issued tokens.
    AwaitPayment {
        reference: String,
        #[arg(long, value_enum, default_value_t = PollProfile::BankTransfer)]
        profile: PollProfile,
        #[arg(long)]
        max_attempts: Option<u32>,
        #[arg(long)]
        interval_secs: Option<u64>,
        #[arg(long)]
        min_wait_secs: Option<u64>,
        #[arg(long, help = "End the session if a status check call fails")]
        fail_on_check_error: bool,
    },
    /// Transfer funds, confirming with an OTP read from stdin.
    Transfer {
        #[arg(long)]
        asset: String,
        #[arg(long, help = "Available balance of the asset")]
        available: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        recipient: String,
        #[arg(long, default_value = "")]
        narration: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PollProfile {
    BankTransfer,
    CardVend,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("voltdesk v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let api = HttpBillingApi::new(
        &cli.api_url,
        cli.api_token.clone(),
        Duration::from_secs(cli.timeout_secs),
    )
    .context("configuring billing API client")?;
    let (ctx, notices) = FlowContext::new(Arc::new(api));
    let printer = tokio::spawn(print_notices(notices));

    let result = match cli.command {
        Commands::Lookup { kind, value } => lookup(&ctx, kind, &value).await,
        Commands::Search { kind } => search(ctx.clone(), kind, cli.timeout_secs).await,
        Commands::AwaitPayment {
            reference,
            profile,
            max_attempts,
            interval_secs,
            min_wait_secs,
            fail_on_check_error,
        } => {
            let mut settings = match profile {
                PollProfile::BankTransfer => PollSettings::bank_transfer(),
                PollProfile::CardVend => PollSettings::card_vend(),
            };
            if let Some(n) = max_attempts {
                settings.max_attempts = n;
            }
            if let Some(secs) = interval_secs {
                settings.interval = Duration::from_secs(secs);
            }
            if let Some(secs) = min_wait_secs {
                settings.min_wait = (secs > 0).then(|| Duration::from_secs(secs));
            }
            if fail_on_check_error {
                settings.on_check_error = CheckErrorPolicy::FailSession;
            }
            await_payment(ctx.clone(), &reference, settings).await
        }
        Commands::Transfer {
            asset,
            available,
            amount,
            recipient,
            narration,
        } => {
            let draft = transfer_draft(asset, &available, &amount, recipient, narration)?;
            transfer(ctx.clone(), draft).await
        }
    };

    drop(ctx);
    let _ = tokio::time::timeout(Duration::from_secs(1), printer).await;
    result
}

async fn print_notices(mut rx: UnboundedReceiver<Notice>) {
    while let Some(notice) = rx.recv().await {
        eprintln!("{}", display::notice_line(&notice));
    }
}

async fn lookup(ctx: &FlowContext, kind: LookupKind, value: &str) -> anyhow::Result<()> {
    let query = LookupQuery::new(kind, value);
    if !query.is_ready(MIN_LOOKUP_LEN) {
        bail!("enter at least {MIN_LOOKUP_LEN} characters to search");
    }
    let result = match ctx.api.lookup_entity(&query).await {
        Ok(Some(account)) => LookupResult::Found(account),
        Ok(None) => LookupResult::NotFound,
        Err(err) => return Err(err).context("looking up customer"),
    };
    print!("{}", display::lookup_result(&result));
    Ok(())
}

async fn search(ctx: FlowContext, kind: LookupKind, timeout_secs: u64) -> anyhow::Result<()> {
    let config = LookupConfig::default();
    let settle = config.debounce + Duration::from_secs(timeout_secs);
    let mut debouncer = Debouncer::new(ctx, kind, config);
    let mut state = debouncer.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last = String::new();

    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("reading stdin")? {
                Some(line) => {
                    debouncer.input(&line);
                    last = line;
                }
                None => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                print_lookup_state(&state.borrow_and_update());
            }
        }
    }

    // Input closed: let the lookup for the final text settle.
    while debouncer.is_pending() {
        let settled = matches!(
            &*state.borrow(),
            LookupState::Settled { query, .. } if query.value == last.trim()
        );
        if settled {
            break;
        }
        match tokio::time::timeout(settle, state.changed()).await {
            Ok(Ok(())) => print_lookup_state(&state.borrow_and_update()),
            _ => break,
        }
    }
    debouncer.teardown();
    Ok(())
}

fn print_lookup_state(state: &LookupState) {
    if let Some(text) = display::lookup_state(state) {
        print!("{text}");
    }
}

async fn await_payment(
    ctx: FlowContext,
    reference: &str,
    settings: PollSettings,
) -> anyhow::Result<()> {
    let poller = ConfirmationPoller::mount(ctx, settings);
    let remaining = poller.guard().remaining();
    if !remaining.is_zero() {
        eprintln!("First check in {}", display::human_duration(remaining));
    }

    let handle = poller.start(reference, PollTrigger::Mount)?;
    let mut progress = handle.progress();
    let outcome = handle.outcome();
    tokio::pin!(outcome);

    let session = loop {
        tokio::select! {
            done = &mut outcome => break done?,
            Ok(()) = progress.changed() => {
                eprintln!("{}", display::progress_line(&progress.borrow_and_update()));
            }
        }
    };

    let presenter = TokenPresenter::for_session(
        &session,
        Arc::new(MemoryClipboard::default()),
        PresenterConfig::default(),
    );
    print!("{}", display::presenter_view(presenter.view()));
    presenter.close();

    match session.status() {
        SessionStatus::Confirmed => Ok(()),
        SessionStatus::TimedOut => bail!(
            "payment {reference} not confirmed after {} checks",
            session.attempt_count()
        ),
        status => bail!(
            "payment {reference} ended as {status:?}: {}",
            session.failure_reason().unwrap_or("no reason given")
        ),
    }
}

fn transfer_draft(
    asset: String,
    available: &str,
    amount: &str,
    recipient: String,
    narration: String,
) -> anyhow::Result<TransferDraft> {
    let available = Decimal::from_str(available.replace(',', "").trim())
        .with_context(|| format!("invalid available balance: {available}"))?;
    let mut input = AmountInput::new();
    if !input.accept(amount) {
        bail!("amount may only contain digits and a decimal point: {amount}");
    }
    Ok(TransferDraft {
        asset: Some(AssetBalance::new(asset, available)),
        amount: input.committed().to_string(),
        recipient_account: recipient,
        narration,
    })
}

async fn transfer(ctx: FlowContext, draft: TransferDraft) -> anyhow::Result<()> {
    let mut flow = TransferFlow::new(ctx, &OtpConfig::default());
    match flow.submit(&draft).await {
        Ok(TransferStage::Completed(receipt)) => {
            print!("{}", display::receipt(receipt));
            return Ok(());
        }
        Ok(_) => {}
        Err(FlowError::Validation(errors)) => {
            for line in errors.summary() {
                eprintln!("  - {line}");
            }
            bail!("transfer form is invalid");
        }
        Err(err) => return Err(err).context("starting transfer"),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!(
            "Enter OTP ('resend' for a new code, {} left): ",
            flow.resends_remaining()
        );
        let Some(line) = lines.next_line().await.context("reading OTP")? else {
            flow.reset();
            bail!("transfer abandoned");
        };
        if line.trim().eq_ignore_ascii_case("resend") {
            match flow.resend_otp().await {
                Ok(_) => continue,
                Err(err @ FlowError::ResendLimitExceeded { .. }) => {
                    flow.reset();
                    return Err(err.into());
                }
                Err(err) => return Err(err).context("resending OTP"),
            }
        }
        match flow.confirm(&line).await {
            Ok(receipt) => {
                print!("{}", display::receipt(&receipt));
                return Ok(());
            }
            Err(FlowError::Rejected(_) | FlowError::Field(_)) => continue,
            Err(err) => return Err(err).context("confirming transfer"),
        }
    }
}
