//! Plain-text rendering for accounts, poll progress, tokens, and receipts.

use std::fmt::Write;
use std::time::Duration;

use voltdesk_core::{
    AccountType, CustomerAccount, LastCheck, LookupResult, PollProgress, TransferReceipt,
};
use voltdesk_flow::{LookupState, Notice, NoticeLevel, PresenterView};

// ── Lookup ──

pub fn account_card(account: &CustomerAccount) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", account.customer_name);
    row(&mut out, "account_number", &account.account_number);
    if let Some(meter) = &account.meter_number {
        row(&mut out, "meter_number", meter);
    }
    row(&mut out, "address", &account.address);
    row(&mut out, "tariff_band", &account.tariff_band);
    let account_type = match account.account_type {
        AccountType::Prepaid => "prepaid",
        AccountType::Postpaid => "postpaid",
    };
    row(&mut out, "account_type", account_type);
    row(
        &mut out,
        "outstanding_balance",
        &account.outstanding_balance.to_string(),
    );
    out
}

pub fn lookup_result(result: &LookupResult) -> String {
    match result {
        LookupResult::Found(account) => account_card(account),
        LookupResult::NotFound => "No customer found\n".to_string(),
        LookupResult::Error(message) => format!("Lookup failed: {message}\n"),
    }
}

/// Text for a lookup state change; `None` when there is nothing to show.
pub fn lookup_state(state: &LookupState) -> Option<String> {
    match state {
        LookupState::Idle => None,
        LookupState::Searching(query) => Some(format!("Searching for {}...\n", query.value)),
        LookupState::Settled { result, .. } => Some(lookup_result(result)),
    }
}

// ── Confirmation ──

pub fn progress_line(progress: &PollProgress) -> String {
    let check = match &progress.last_check {
        LastCheck::None => "waiting".to_string(),
        LastCheck::Pending => "still pending".to_string(),
        LastCheck::Unreachable(message) => format!("check failed ({message})"),
    };
    format!(
        "[{}/{}] {check}, about {} left",
        progress.attempt,
        progress.max_attempts,
        human_duration(progress.estimated_remaining)
    )
}

pub fn human_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 60, secs % 60) {
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s}s"),
    }
}

pub fn presenter_view(view: &PresenterView) -> String {
    let mut out = String::new();
    match view {
        PresenterView::Tokens(tokens) => {
            let _ = writeln!(out, "=== Payment confirmed ===");
            for (i, artifact) in tokens.iter().enumerate() {
                let label = format!("token #{}", i + 1);
                row(&mut out, &label, &artifact.token);
                if let Some(amount) = artifact.amount {
                    let unit = artifact.unit.as_deref().unwrap_or_default();
                    row(&mut out, "  amount", format!("{amount} {unit}").trim_end());
                }
                if let Some(description) = &artifact.description {
                    row(&mut out, "  description", description);
                }
            }
        }
        PresenterView::GenericSuccess {
            amount,
            description,
        } => {
            let _ = writeln!(out, "=== Payment confirmed ===");
            if let Some(amount) = amount {
                row(&mut out, "amount", &amount.to_string());
            }
            row(
                &mut out,
                "description",
                description.as_deref().unwrap_or("Payment received"),
            );
        }
        PresenterView::NotConfirmed(status) => {
            let _ = writeln!(out, "Payment not confirmed ({status:?})");
        }
    }
    out
}

// ── Transfer ──

pub fn receipt(receipt: &TransferReceipt) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Transfer successful ===");
    row(&mut out, "reference", &receipt.reference);
    row(&mut out, "amount", &receipt.amount.to_string());
    row(&mut out, "recipient_account", &receipt.recipient_account);
    if let Some(name) = &receipt.recipient_name {
        row(&mut out, "recipient_name", name);
    }
    if let Some(at) = receipt.completed_at {
        row(&mut out, "completed_at", &at.to_rfc3339());
    }
    out
}

pub fn notice_line(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warn",
        NoticeLevel::Error => "error",
    };
    format!("[{tag}] {}", notice.message)
}

fn row(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(out, "  {:<26} {}", name, value);
}
