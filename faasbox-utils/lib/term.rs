//! Terminal styling helpers.

use std::sync::LazyLock;

use console::style;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// A green checkmark used in startup output.
pub static CHECKMARK: LazyLock<String> = LazyLock::new(|| format!("{}", style("✓").green()));

/// A red cross used in failure output.
pub static CROSS: LazyLock<String> = LazyLock::new(|| format!("{}", style("✗").red()));
