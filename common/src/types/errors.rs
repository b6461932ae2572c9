use std::fmt;
use std::fmt::Formatter;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub struct UnknownStopNameError(pub String);

impl fmt::Display for UnknownStopNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown stop name '{}'", self.0)
    }
}
