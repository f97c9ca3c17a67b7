mod common;
mod pipeline_tests;
mod queue_tests;
