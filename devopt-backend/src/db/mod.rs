mod sqlite;
mod tables;

#[cfg(test)]
pub(crate) mod fixtures;

pub use sqlite::Database;
pub(crate) use sqlite::{parse_date, parse_json_list, parse_timestamp};
