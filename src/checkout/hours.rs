//! Service hours
//!
//! Checkout is only open inside the store's local service window for the day.

use jiff::{
    Zoned,
    civil::{Time, Weekday, time},
};
use thiserror::Error;

/// A daily opening window: opens inclusive, closes exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceWindow {
    opens: Time,
    closes: Time,
}

impl ServiceWindow {
    /// Create a window, or `None` unless it opens strictly before it closes.
    pub fn new(opens: Time, closes: Time) -> Option<Self> {
        (opens < closes).then_some(Self { opens, closes })
    }

    /// Opening time
    pub const fn opens(&self) -> Time {
        self.opens
    }

    /// Closing time
    pub const fn closes(&self) -> Time {
        self.closes
    }

    /// Whether a local time falls inside the window.
    pub fn contains(&self, at: Time) -> bool {
        self.opens <= at && at < self.closes
    }
}

/// Weekday and weekend service windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHours {
    /// Monday to Friday
    pub weekdays: ServiceWindow,

    /// Saturday and Sunday
    pub weekends: ServiceWindow,
}

impl Default for ServiceHours {
    fn default() -> Self {
        Self {
            weekdays: ServiceWindow {
                opens: time(7, 0, 0, 0),
                closes: time(20, 0, 0, 0),
            },
            weekends: ServiceWindow {
                opens: time(8, 0, 0, 0),
                closes: time(19, 0, 0, 0),
            },
        }
    }
}

/// Checkout attempted outside service hours.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "we're closed right now ({weekday:?} {at}), checkout is open from {} to {} today",
    .window.opens(),
    .window.closes()
)]
pub struct Closed {
    /// Local day of the attempt
    pub weekday: Weekday,

    /// Local time of the attempt
    pub at: Time,

    /// That day's window
    pub window: ServiceWindow,
}

impl ServiceHours {
    /// The window that applies on a given day.
    pub const fn window_for(&self, weekday: Weekday) -> &ServiceWindow {
        match weekday {
            Weekday::Saturday | Weekday::Sunday => &self.weekends,
            _ => &self.weekdays,
        }
    }

    /// Whether checkout is open at a local instant.
    pub fn is_open(&self, now: &Zoned) -> bool {
        self.check(now).is_ok()
    }

    /// Check that checkout is open at a local instant.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] naming the day's window when it is not.
    pub fn check(&self, now: &Zoned) -> Result<(), Closed> {
        let weekday = now.weekday();
        let at = now.time();
        let window = *self.window_for(weekday);

        if window.contains(at) {
            Ok(())
        } else {
            Err(Closed {
                weekday,
                at,
                window,
            })
        }
    }
}
