pub mod consultation;
pub mod order;
pub mod user;

pub use consultation::{
    ConsultationPriority, ConsultationRequest, ConsultationSource, ConsultationStatus,
};
pub use order::{Order, OrderAddOn, OrderStatus, PaymentModeKind};
pub use user::{Role, UserAccount};

/// Why a status change was refused. Refused changes never reach the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("status is already '{0}'")]
    Unchanged(String),

    #[error("cannot move from '{from}' to '{to}'")]
    NotAllowed { from: String, to: String },
}

impl From<TransitionError> for crate::errors::ServiceError {
    fn from(err: TransitionError) -> Self {
        crate::errors::ServiceError::InvalidStatus(err.to_string())
    }
}
