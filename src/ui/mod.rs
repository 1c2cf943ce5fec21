//! Terminal output
//!
//! Interactive terminals get `cliclack` spinners and log lines. CI and
//! piped runs get plain `[OK]` / `[WARN]` / `[FAIL]` lines instead.
//!
//! ```rust,ignore
//! use npm_accel::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect().with_quiet(cli.quiet > 0);
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Installing dependencies...");
//! spinner.stop("Restored node_modules from cache");
//!
//! ui::step_warn_hint(&ctx, "Could not update cache", "check permissions");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{remark, section, step_warn_hint, table_row};
pub use progress::TaskSpinner;
