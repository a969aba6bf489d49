mod common;

mod model_tests;
mod retry_tests;
