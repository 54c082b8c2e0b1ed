use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use voltdesk_api::{ApiError, BillingApi};
use voltdesk_core::{
    AccountType, CustomerAccount, InitiatedTransfer, LookupQuery, OtpPurpose,
    PaymentStatusReport, StatusCode, TransferDecision, TransferRequest,
};

/// Scripted in-memory API with call counters.
#[derive(Default)]
pub struct FakeApi {
    pub accounts: HashMap<String, CustomerAccount>,
    pub lookups: Mutex<Vec<String>>,
    pub lookup_delay: Duration,
    pub lookup_fails: bool,

    /// Status responses, consumed front to back. `Err(status)` simulates a
    /// failed call. Once empty, every check reports Pending.
    pub status_script: Mutex<VecDeque<Result<PaymentStatusReport, u16>>>,
    pub status_calls: AtomicU32,
    pub check_delay: Duration,
    pub in_flight: AtomicU32,
    pub max_in_flight: AtomicU32,

    pub initiations: AtomicU32,
    pub requires_otp: bool,
    pub otp_requests: AtomicU32,
    pub otp_fails: bool,
    pub decisions: Mutex<VecDeque<TransferDecision>>,
    pub confirmations: AtomicU32,
}

impl FakeApi {
    pub fn with_account(mut self, value: &str) -> Self {
        self.accounts.insert(value.to_string(), account(value));
        self
    }

    pub fn script(self, responses: Vec<Result<PaymentStatusReport, u16>>) -> Self {
        *self.status_script.lock().unwrap() = responses.into();
        self
    }

    pub fn lookup_values(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

pub fn account(meter: &str) -> CustomerAccount {
    CustomerAccount {
        account_number: "0100234567".into(),
        customer_name: "Ada Obi".into(),
        meter_number: Some(meter.into()),
        address: "12 Marina Road".into(),
        tariff_band: "A".into(),
        account_type: AccountType::Prepaid,
        outstanding_balance: Decimal::ZERO,
    }
}

pub fn report(status: StatusCode) -> PaymentStatusReport {
    PaymentStatusReport {
        status,
        artifacts: vec![],
        amount: None,
        description: None,
    }
}

#[async_trait]
impl BillingApi for FakeApi {
    async fn lookup_entity(
        &self,
        query: &LookupQuery,
    ) -> Result<Option<CustomerAccount>, ApiError> {
        self.lookups.lock().unwrap().push(query.value.clone());
        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }
        if self.lookup_fails {
            return Err(ApiError::Server {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(self.accounts.get(&query.value).cloned())
    }

    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<InitiatedTransfer, ApiError> {
        let n = self.initiations.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(InitiatedTransfer {
            reference: format!("TRF-{n}-{}", request.recipient_account),
            requires_otp: self.requires_otp,
        })
    }

    async fn request_otp(&self, _purpose: OtpPurpose) -> Result<bool, ApiError> {
        self.otp_requests.fetch_add(1, Ordering::SeqCst);
        if self.otp_fails {
            return Err(ApiError::Server {
                status: 503,
                body: "sms gateway unavailable".into(),
            });
        }
        Ok(true)
    }

    async fn confirm_transfer(
        &self,
        _reference: &str,
        _otp: &str,
    ) -> Result<TransferDecision, ApiError> {
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::Server {
                status: 500,
                body: "no decision scripted".into(),
            })
    }

    async fn check_payment_status(
        &self,
        _reference: &str,
    ) -> Result<PaymentStatusReport, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.check_delay.is_zero() {
            tokio::time::sleep(self.check_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self.status_script.lock().unwrap().pop_front();
        match next {
            Some(Ok(report)) => Ok(report),
            Some(Err(status)) => Err(ApiError::Server {
                status,
                body: "scripted failure".into(),
            }),
            None => Ok(report(StatusCode::Pending)),
        }
    }
}
