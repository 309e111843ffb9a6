//! Limits for configuration values.

use std::cmp;

//------------ DefMinMax -----------------------------------------------------

/// The default, minimum, and maximum values for a config variable.
#[derive(Clone, Copy, Debug)]
pub struct DefMinMax<T> {
    /// The default value,
    def: T,

    /// The minimum value,
    min: T,

    /// The maximum value,
    max: T,
}

impl<T> DefMinMax<T> {
    /// Creates a new value.
    pub const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    /// Returns the default value.
    pub fn default(self) -> T {
        self.def
    }

    /// Trims the given value to fit into the minimum/maximum range.
    pub fn limit(self, value: T) -> T
    where
        T: Ord,
    {
        cmp::max(self.min, cmp::min(self.max, value))
    }

    /// Trims the value and logs if it had to be changed.
    ///
    /// The `name` of the variable is only used for logging.
    pub fn limit_logged(self, name: &str, value: T) -> T
    where
        T: Ord + Copy + std::fmt::Debug,
    {
        let res = self.limit(value);
        if res != value {
            tracing::warn!("{name}: {value:?} out of range, using {res:?}");
        }
        res
    }
}

//============ Testing =======================================================
