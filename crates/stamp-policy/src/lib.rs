//! # stamp-policy — Governance Policy over Diagnostics and Metadata
//!
//! The decision layer between raw diagnostics and any change to a document.
//!
//! - [`classify`] sorts diagnostics and domain-rule findings into fatal,
//!   repairable and warning tiers and derives a [`Status`].
//! - [`fix::build`] turns diagnostics into [`FixProposal`]s tagged
//!   `mechanical`, `inferred` or `prohibited`; [`fix::apply`] applies only
//!   what policy and approval allow.
//! - [`normalize`] rewrites a metadata mapping into canonical form. It is
//!   idempotent under a fixed clock.
//! - [`DependencyGraph`] collects declared document dependencies for one
//!   batch and reports cycles.
//!
//! Everything here is pure over its inputs. Time comes from an injected
//! [`stamp_core::Clock`]; tunables come from [`PolicyConfig`].

pub mod classify;
pub mod config;
pub mod fix;
pub mod graph;
pub mod normalize;

pub use classify::{classify, ClassificationResult, Finding, FindingKind, MetadataState, Status};
pub use config::{ConfigError, PolicyConfig, TypeMismatchPolicy};
pub use fix::{
    apply, build, ApplyOutcome, FixAction, FixProposal, ProposalClassification, ProposalSummary,
    ProposalTarget,
};
pub use graph::{Cycle, DependencyGraph};
pub use normalize::{normalize, NormalizationReport};
