//! Unit tests for individual components

mod builders_test;
mod config_test;
mod cron_expression_test;
mod cron_field_test;
mod error_test;
mod stats_test;
mod task_test;
mod util_test;
