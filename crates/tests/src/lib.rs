pub mod fixtures;

#[cfg(test)]
mod chat_tests;
#[cfg(test)]
mod credential_tests;
#[cfg(test)]
mod lifecycle_tests;
