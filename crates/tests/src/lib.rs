//! Cross-crate integration tests for the audio groups engine

#[cfg(test)]
mod classification_integration;
