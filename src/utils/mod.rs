mod string;

pub use string::{package_name_from_path, unquote_string};
