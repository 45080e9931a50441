//! Output formatting module.

mod formatter;
mod human;
mod json;

pub use formatter::Operation;
pub use formatter::OutputFormatter;

use human::HumanFormatter;
use json::JsonFormatter;

/// Line printed when packing succeeds.
pub const PACK_SUCCESS: &str = "All files archived successfully";

/// Line printed when unpacking succeeds.
pub const UNPACK_SUCCESS: &str = "Files restoring finished with success";

/// Line printed whenever an operation does not succeed.
pub const FAILURE: &str = "Something went wrong. Please verify result";

/// Creates an output formatter based on CLI flags
pub fn create_formatter(json: bool, verbose: bool, quiet: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter::new(verbose, quiet))
    }
}
