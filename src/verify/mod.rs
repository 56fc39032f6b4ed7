pub mod probe;
pub mod suite;

pub use probe::{ProbeDiagnostic, ProbeResult, VerificationReport, RECURSION_SIGNATURE};
pub use suite::VerificationSuite;
