pub mod confirmation;
pub mod lookup;
pub mod money;
pub mod status;
pub mod transfer;

pub use confirmation::{
    CheckErrorPolicy, ConfirmationSession, LastCheck, PaymentStatusReport, PollProgress, PollSettings,
    RedemptionArtifact, SessionError, SessionStatus, Transition,
};
pub use lookup::{
    AccountType, CustomerAccount, LookupKind, LookupQuery, LookupResult, MIN_LOOKUP_LEN,
};
pub use money::{AmountInput, AssetBalance, ValidationError, parse_amount};
pub use status::{PaymentStatus, StatusCode, UnknownStatusCode};
pub use transfer::{
    FieldErrors, InitiatedTransfer, OtpPurpose, TransferDecision, TransferDraft, TransferField,
    TransferReceipt, TransferRequest, validate_otp,
};
