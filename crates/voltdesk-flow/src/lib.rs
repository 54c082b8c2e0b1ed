//! Interactive flows over the billing API: each flow owns its timers and
//! tears them down when it is dropped.

pub mod context;
pub mod debounce;
mod error;
pub mod otp;
pub mod poller;
pub mod presenter;
pub mod transfer;

#[cfg(test)]
mod fake;

pub use context::{FlowContext, Notice, NoticeLevel, Notices};
pub use debounce::{Debouncer, LookupConfig, LookupState};
pub use error::FlowError;
pub use otp::{OtpConfig, OtpResendGate};
pub use poller::{ConfirmationPoller, MinWaitGuard, PollHandle, PollTrigger};
pub use presenter::{
    Clipboard, ClipboardError, MemoryClipboard, PresenterConfig, PresenterView, TokenPresenter,
};
pub use transfer::{TransferFlow, TransferStage};
