//! # Constants
//!
//! Shared constants used throughout the crate.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Path separator used by Parameter Store names
pub const PATH_SEPARATOR: char = '/';

/// Separator used to split `StringList` parameter values
pub const LIST_SEPARATOR: char = ',';

/// Default store prefix when none is configured (the whole hierarchy)
pub const DEFAULT_PREFIX: &str = "/";

/// Default `DescribeParameters` page size
/// AWS caps this at 50 results per page
pub const DEFAULT_PAGE_SIZE: i32 = 50;

/// Default tracing filter for the CLI when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "pstore=info,paramstore=info";

/// Backend label used in metrics for the AWS implementation
pub const SSM_BACKEND_LABEL: &str = "aws_parameter_store";

/// Backend label used in metrics for the in-memory implementation
pub const MEMORY_BACKEND_LABEL: &str = "memory";
