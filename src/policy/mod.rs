//! Pure decision logic consulted by the writer: when a file must stop
//! accepting records, and when bulk segment copy is legal.
//!
//! Nothing in here holds state or performs I/O; every function is a pure
//! function of its arguments and can be called repeatedly.

pub mod closing;
pub mod fast_clone;

pub use closing::{
    ClosingCriteria, ClosingPolicyEvaluator, ClosingVerdict, ClosureRequestMode, FileCounters,
};
pub use fast_clone::{FastCloneDecisionEngine, FastCloneDenial};
