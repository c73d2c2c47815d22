pub mod domain;
pub mod protocol;

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
