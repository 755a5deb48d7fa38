//! Terminal output for the one-shot `scan` and `history` commands.

mod json_format;
mod plain;

pub use json_format::print_json;
pub use plain::{
    print_error, print_history, print_info, print_record, print_scan_header, print_scan_result,
    print_success, print_warning,
};
