//! Enrollment-fee payments: order issuance, callback verification, and the
//! student status transitions they drive.

pub mod orders;
pub mod state_machine;
pub mod status;
pub mod verification;

pub use orders::{IssuedOrder, OrderError, OrderIssuer, OrderSettings};
pub use state_machine::{EnrollmentTransition, TransitionConflict};
pub use status::{EnrollmentOverview, EnrollmentQuery};
pub use verification::{
    FailureReason, PaymentCallback, PaymentVerifier, VerificationError,
    VerificationOutcome,
};
