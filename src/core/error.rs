//! Error handling for kustgraph
//!
//! Two layers, the same split used throughout the crate:
//! 1. [`KustgraphError`] - a strongly-typed enum returned by the engine
//!    (resolver, loader, builder, queries) so callers can match on the exact
//!    failure.
//! 2. [`ErrorContext`] - a wrapper adding details and an actionable suggestion
//!    for CLI users, rendered with terminal colors.
//!
//! Build-time errors (`ReferenceSyntax`, `NodeNotFound`, `NodeMalformed`,
//! `CycleDetected`, `BuildCancelled`) abort the whole build; no partial graph
//! is ever returned. `UnknownNode` and `NotAnOverlay` are local to the query
//! that raised them.
//!
//! Errors raised while following a reference carry the declaring chain, the
//! list of nodes from a root down to the node that declared the reference.
//! It renders as `root → … → node`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use kustgraph_cli::core::{KustgraphError, user_friendly_error};
//!
//! fn check() -> Result<(), KustgraphError> {
//!     Err(KustgraphError::GitNotFound)
//! }
//!
//! if let Err(e) = check() {
//!     user_friendly_error(anyhow::Error::from(e)).display();
//! }
//! ```

use crate::core::identity::{NodeIdentity, format_chain};
use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for graph construction and queries.
#[derive(Error, Debug)]
pub enum KustgraphError {
    /// A reference string could not be turned into an identity.
    ///
    /// Raised by the resolver for malformed remote locators, empty references,
    /// or structural references naming a plain file.
    #[error("Malformed reference '{reference}': {reason}{}", declared_by(.chain))]
    ReferenceSyntax {
        /// The raw reference as written in the declaring document
        reference: String,
        /// Why the reference is not acceptable
        reason: String,
        /// Nodes from a root down to the declaring node
        chain: Vec<NodeIdentity>,
    },

    /// The target of a reference does not exist.
    #[error("Node not found: {identity} (referenced as '{reference}'{})", declared_by(.chain))]
    NodeNotFound {
        /// Identity the reference resolved to
        identity: NodeIdentity,
        /// The raw reference as written in the declaring document
        reference: String,
        /// Nodes from a root down to the declaring node
        chain: Vec<NodeIdentity>,
    },

    /// The target exists but its content cannot be used.
    ///
    /// Covers unparseable YAML, overlays that are not a single mapping, and
    /// declaration fields of the wrong shape.
    #[error("Malformed node {identity}: {reason}{}", referenced_as(.reference, .chain))]
    NodeMalformed {
        /// Identity of the malformed node
        identity: NodeIdentity,
        /// What is wrong with it
        reason: String,
        /// The raw reference that led here, empty for roots
        reference: String,
        /// Nodes from a root down to the declaring node
        chain: Vec<NodeIdentity>,
    },

    /// The Base/Component sub-relation contains a cycle.
    ///
    /// The path is in traversal order and closes on its first node, so a
    /// self-reference is reported as `[A, A]`.
    #[error("Cycle detected among bases/components: {}", format_chain(.cycle))]
    CycleDetected {
        /// Nodes on the cycle, first node repeated at the end
        cycle: Vec<NodeIdentity>,
    },

    /// A query named an identity that is not part of the graph.
    #[error("Unknown node: {identity}{}", did_you_mean(.suggestions))]
    UnknownNode {
        /// The identity (or path) that was queried
        identity: String,
        /// Closest known identities, best first
        suggestions: Vec<String>,
    },

    /// The build was cancelled or ran past its deadline.
    #[error("Build cancelled: {reason}")]
    BuildCancelled {
        /// `cancelled by caller` or `deadline exceeded`
        reason: String,
    },

    /// A query that needs an overlay was given another kind of node.
    #[error("Not an overlay: {identity}")]
    NotAnOverlay {
        /// The offending identity
        identity: NodeIdentity,
    },

    /// Configuration file could not be read or is invalid.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// Git executable not found in PATH.
    ///
    /// Only raised when a remote reference has to be fetched.
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// A git command returned a non-zero exit code.
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g. "clone")
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

fn declared_by(chain: &[NodeIdentity]) -> String {
    if chain.is_empty() {
        String::new()
    } else {
        format!(" declared by {}", format_chain(chain))
    }
}

fn referenced_as(reference: &str, chain: &[NodeIdentity]) -> String {
    if reference.is_empty() {
        String::new()
    } else {
        format!(" (referenced as '{reference}'{})", declared_by(chain))
    }
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

impl KustgraphError {
    /// Returns `true` for errors that abort a build.
    #[must_use]
    pub const fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::ReferenceSyntax { .. }
                | Self::NodeNotFound { .. }
                | Self::NodeMalformed { .. }
                | Self::CycleDetected { .. }
                | Self::BuildCancelled { .. }
        )
    }

    /// Attaches a declaring chain to errors raised below the builder.
    ///
    /// The resolver and loader do not know how a node was reached; the builder
    /// fills in the chain and raw reference once the error surfaces.
    #[must_use]
    pub fn with_origin(self, reference: &str, chain: &[NodeIdentity]) -> Self {
        match self {
            Self::ReferenceSyntax { reason, .. } => Self::ReferenceSyntax {
                reference: reference.to_string(),
                reason,
                chain: chain.to_vec(),
            },
            Self::NodeNotFound { identity, .. } => Self::NodeNotFound {
                identity,
                reference: reference.to_string(),
                chain: chain.to_vec(),
            },
            Self::NodeMalformed { identity, reason, .. } => Self::NodeMalformed {
                identity,
                reason,
                reference: reference.to_string(),
                chain: chain.to_vec(),
            },
            other => other,
        }
    }
}

impl Clone for KustgraphError {
    fn clone(&self) -> Self {
        match self {
            Self::ReferenceSyntax { reference, reason, chain } => Self::ReferenceSyntax {
                reference: reference.clone(),
                reason: reason.clone(),
                chain: chain.clone(),
            },
            Self::NodeNotFound { identity, reference, chain } => Self::NodeNotFound {
                identity: identity.clone(),
                reference: reference.clone(),
                chain: chain.clone(),
            },
            Self::NodeMalformed { identity, reason, reference, chain } => Self::NodeMalformed {
                identity: identity.clone(),
                reason: reason.clone(),
                reference: reference.clone(),
                chain: chain.clone(),
            },
            Self::CycleDetected { cycle } => Self::CycleDetected {
                cycle: cycle.clone(),
            },
            Self::UnknownNode { identity, suggestions } => Self::UnknownNode {
                identity: identity.clone(),
                suggestions: suggestions.clone(),
            },
            Self::BuildCancelled { reason } => Self::BuildCancelled {
                reason: reason.clone(),
            },
            Self::NotAnOverlay { identity } => Self::NotAnOverlay {
                identity: identity.clone(),
            },
            Self::ConfigError { message } => Self::ConfigError {
                message: message.clone(),
            },
            Self::GitNotFound => Self::GitNotFound,
            Self::GitCommandError { operation, stderr } => Self::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            // io::Error is not Clone; keep kind and message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
            Self::Other { message } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// An error plus the extra information shown to CLI users.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: KustgraphError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: KustgraphError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error (printed in green).
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error (printed in yellow).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts any error into an [`ErrorContext`] with suggestions.
///
/// [`KustgraphError`]s anywhere in the chain get variant-specific advice;
/// common IO and TOML failures are recognized; everything else is shown with
/// its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(kg_error) = error.chain().find_map(|e| e.downcast_ref::<KustgraphError>()) {
        return create_error_context(kg_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(KustgraphError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check file ownership and permissions of the apps directory")
                .with_details("kustgraph only reads files, but it needs read access to every referenced path");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(KustgraphError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(KustgraphError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your kustgraph config file");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(KustgraphError::Other { message })
}

fn create_error_context(error: KustgraphError) -> ErrorContext {
    match &error {
        KustgraphError::ReferenceSyntax { .. } => ErrorContext::new(error)
            .with_suggestion("Use a relative path, an absolute path, or a remote locator such as 'https://github.com/org/repo//path?ref=v1'")
            .with_details("Bases and components must point at directories; plain manifests belong under 'resources'"),

        KustgraphError::NodeNotFound { identity, .. } => {
            let details = if identity.is_remote() {
                "The path does not exist in the remote repository at the requested revision".to_string()
            } else {
                format!("No file or kustomization was found at {identity}")
            };
            ErrorContext::new(error)
                .with_suggestion("Fix or remove the reference in the declaring kustomization")
                .with_details(details)
        }

        KustgraphError::NodeMalformed { .. } => ErrorContext::new(error)
            .with_suggestion("Check the YAML syntax and that declaration fields such as 'resources' are lists"),

        KustgraphError::CycleDetected { .. } => ErrorContext::new(error)
            .with_suggestion("Remove one of the base/component references on the cycle")
            .with_details("Bases and components must form an acyclic hierarchy; resources may refer back freely"),

        KustgraphError::UnknownNode { .. } => ErrorContext::new(error)
            .with_suggestion("Use 'kustgraph list-root-apps' to see the overlays found in the apps directory"),

        KustgraphError::NotAnOverlay { .. } => ErrorContext::new(error)
            .with_suggestion("Pass a directory containing a kustomization file or the kustomization file itself"),

        KustgraphError::BuildCancelled { .. } => ErrorContext::new(error)
            .with_suggestion("Increase the timeout or reduce the number of remote references"),

        KustgraphError::GitNotFound => ErrorContext::new(error)
            .with_suggestion("Install git from https://git-scm.com/ or your package manager, or run with --no-remote")
            .with_details("Remote references are fetched with the system git binary"),

        KustgraphError::GitCommandError { operation, stderr } => {
            let details = if stderr.trim().is_empty() {
                format!("git {operation} exited with an error")
            } else {
                stderr.trim().to_string()
            };
            ErrorContext::new(error)
                .with_suggestion("Check the repository URL, the revision, and your network access")
                .with_details(details)
        }

        KustgraphError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the configuration file or point KUSTGRAPH_CONFIG at a valid one"),

        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<NodeIdentity> {
        vec![NodeIdentity::local("/apps/prod"), NodeIdentity::local("/apps/base")]
    }

    #[test]
    fn test_error_display() {
        let error = KustgraphError::NodeNotFound {
            identity: NodeIdentity::local("/apps/missing"),
            reference: "../missing".to_string(),
            chain: chain(),
        };
        assert_eq!(
            error.to_string(),
            "Node not found: /apps/missing (referenced as '../missing' declared by /apps/prod → /apps/base)"
        );

        let error = KustgraphError::CycleDetected {
            cycle: vec![NodeIdentity::local("/a"), NodeIdentity::local("/a")],
        };
        assert_eq!(error.to_string(), "Cycle detected among bases/components: /a → /a");

        let error = KustgraphError::UnknownNode {
            identity: "/apps/prd".to_string(),
            suggestions: vec!["/apps/prod".to_string()],
        };
        assert_eq!(error.to_string(), "Unknown node: /apps/prd (did you mean: /apps/prod?)");
    }

    #[test]
    fn test_malformed_root_has_no_origin() {
        let error = KustgraphError::NodeMalformed {
            identity: NodeIdentity::local("/apps/prod"),
            reason: "expected a mapping".to_string(),
            reference: String::new(),
            chain: Vec::new(),
        };
        assert_eq!(error.to_string(), "Malformed node /apps/prod: expected a mapping");
    }

    #[test]
    fn test_with_origin_fills_chain() {
        let error = KustgraphError::ReferenceSyntax {
            reference: String::new(),
            reason: "empty reference".to_string(),
            chain: Vec::new(),
        }
        .with_origin("", &chain());

        match error {
            KustgraphError::ReferenceSyntax { chain: c, .. } => assert_eq!(c, chain()),
            other => panic!("unexpected error: {other:?}"),
        }

        let untouched = KustgraphError::GitNotFound.with_origin("x", &chain());
        assert!(matches!(untouched, KustgraphError::GitNotFound));
    }

    #[test]
    fn test_is_build_error() {
        assert!(KustgraphError::BuildCancelled { reason: "deadline exceeded".into() }.is_build_error());
        assert!(!KustgraphError::UnknownNode { identity: "x".into(), suggestions: vec![] }.is_build_error());
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(KustgraphError::GitNotFound).with_suggestion("Install git");
        let display = format!("{ctx}");
        assert!(display.contains("Git is not installed or not found in PATH"));
        assert!(display.contains("Suggestion: Install git"));
    }

    #[test]
    fn test_user_friendly_error_finds_wrapped_error() {
        let error = anyhow::Error::from(KustgraphError::CycleDetected {
            cycle: vec![NodeIdentity::local("/a"), NodeIdentity::local("/a")],
        })
        .context("Failed to build graph");

        let ctx = user_friendly_error(error);
        assert!(matches!(ctx.error, KustgraphError::CycleDetected { .. }));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn test_user_friendly_error_generic_chain() {
        let error = anyhow::anyhow!("inner").context("outer");
        let ctx = user_friendly_error(error);
        let text = ctx.error.to_string();
        assert!(text.starts_with("outer"));
        assert!(text.contains("1: inner"));
    }

    #[test]
    fn test_clone_io_error() {
        let error = KustgraphError::from(std::io::Error::other("boom"));
        let cloned = error.clone();
        assert_eq!(error.to_string(), cloned.to_string());
    }
}
