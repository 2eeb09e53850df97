//! Declarative value producers
//!
//! Bindings files describe each placeholder with a tagged spec:
//!
//! ```json
//! {"kind": "random_int", "min": 1, "max": 100}
//! {"kind": "utc_days_ago", "min_days": 1, "max_days": 30, "format": "%Y-%m-%d"}
//! ```

use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Zero-argument value producer, called once per resolution
pub type Producer = Arc<dyn Fn() -> String + Send + Sync>;

/// Date format used when a spec does not name one
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Upper bound for `utc_days_ago`, about ten thousand years
pub const MAX_DAYS_AGO: u32 = 3_650_000;

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// Declarative description of a producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProducerSpec {
    /// Always the same value
    Literal {
        /// Value substituted verbatim
        value: String,
    },

    /// Uniform integer in `min..=max`
    RandomInt {
        /// Lower bound, inclusive
        min: i64,
        /// Upper bound, inclusive
        max: i64,
    },

    /// Uniform pick from a list
    Choice {
        /// Candidate values
        values: Vec<String>,
    },

    /// Current UTC time
    UtcNow {
        /// strftime format
        #[serde(default = "default_date_format")]
        format: String,
    },

    /// UTC time a uniform number of days in the past
    UtcDaysAgo {
        /// Fewest days back, inclusive
        min_days: u32,
        /// Most days back, inclusive
        max_days: u32,
        /// strftime format
        #[serde(default = "default_date_format")]
        format: String,
    },
}

impl ProducerSpec {
    /// Check the spec can always produce a value
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Literal { .. } => Ok(()),
            Self::RandomInt { min, max } if min > max => {
                Err(format!("random_int min {min} is greater than max {max}"))
            }
            Self::RandomInt { .. } => Ok(()),
            Self::Choice { values } if values.is_empty() => {
                Err("choice needs at least one value".to_string())
            }
            Self::Choice { .. } => Ok(()),
            Self::UtcNow { format } => validate_format(format),
            Self::UtcDaysAgo {
                min_days,
                max_days,
                format,
            } => {
                if min_days > max_days {
                    return Err(format!(
                        "utc_days_ago min_days {min_days} is greater than max_days {max_days}"
                    ));
                }
                if *max_days > MAX_DAYS_AGO {
                    return Err(format!(
                        "utc_days_ago max_days {max_days} exceeds {MAX_DAYS_AGO}"
                    ));
                }
                validate_format(format)
            }
        }
    }

    /// Turn the spec into a producer
    pub fn into_producer(self) -> Result<Producer, String> {
        self.validate()?;

        let producer: Producer = match self {
            Self::Literal { value } => Arc::new(move || value.clone()),
            Self::RandomInt { min, max } => {
                Arc::new(move || rand::thread_rng().gen_range(min..=max).to_string())
            }
            Self::Choice { values } => Arc::new(move || {
                let index = rand::thread_rng().gen_range(0..values.len());
                values[index].clone()
            }),
            Self::UtcNow { format } => Arc::new(move || Utc::now().format(&format).to_string()),
            Self::UtcDaysAgo {
                min_days,
                max_days,
                format,
            } => Arc::new(move || {
                let days = rand::thread_rng().gen_range(min_days..=max_days);
                days_ago(Utc::now(), days).format(&format).to_string()
            }),
        };

        Ok(producer)
    }
}

/// `now` minus `days`, clamped to the earliest representable instant
fn days_ago(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(TimeDelta::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn validate_format(format: &str) -> Result<(), String> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        Err(format!("invalid date format {format:?}"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_spec_deserialization() {
        let spec: ProducerSpec =
            serde_json::from_str(r#"{"kind": "random_int", "min": 1, "max": 3}"#).unwrap();
        assert_eq!(spec, ProducerSpec::RandomInt { min: 1, max: 3 });

        let spec: ProducerSpec = serde_json::from_str(r#"{"kind": "utc_now"}"#).unwrap();
        assert_eq!(
            spec,
            ProducerSpec::UtcNow {
                format: DEFAULT_DATE_FORMAT.into()
            }
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(serde_json::from_str::<ProducerSpec>(r#"{"kind": "uuid"}"#).is_err());
    }

    #[test]
    fn test_literal() {
        let producer = ProducerSpec::Literal { value: "2".into() }
            .into_producer()
            .unwrap();
        assert_eq!(producer(), "2");
    }

    #[test]
    fn test_random_int_in_range() {
        let producer = ProducerSpec::RandomInt { min: -2, max: 2 }
            .into_producer()
            .unwrap();
        for _ in 0..100 {
            let value: i64 = producer().parse().unwrap();
            assert!((-2..=2).contains(&value));
        }
    }

    #[test]
    fn test_choice() {
        let producer = ProducerSpec::Choice {
            values: vec!["a".into(), "b".into()],
        }
        .into_producer()
        .unwrap();
        for _ in 0..20 {
            let value = producer();
            assert!(value == "a" || value == "b");
        }
    }

    #[test]
    fn test_utc_days_ago() {
        let producer = ProducerSpec::UtcDaysAgo {
            min_days: 1,
            max_days: 3,
            format: DEFAULT_DATE_FORMAT.into(),
        }
        .into_producer()
        .unwrap();

        let today = Utc::now().date_naive();
        let day = NaiveDate::parse_from_str(&producer(), DEFAULT_DATE_FORMAT).unwrap();
        let back = (today - day).num_days();
        // Allow for a date rollover between the two now() calls
        assert!((0..=4).contains(&back), "{back} days back");
    }

    #[test]
    fn test_utc_days_ago_range_is_bounded() {
        let spec = |days| ProducerSpec::UtcDaysAgo {
            min_days: days,
            max_days: days,
            format: DEFAULT_DATE_FORMAT.into(),
        };

        assert!(spec(200_000_000).into_producer().is_err());
        assert!(spec(MAX_DAYS_AGO + 1).validate().is_err());

        let producer = spec(MAX_DAYS_AGO).into_producer().unwrap();
        assert!(!producer().is_empty());
    }

    #[test]
    fn test_days_ago_saturates() {
        assert_eq!(days_ago(DateTime::<Utc>::MIN_UTC, 1), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_invalid_specs() {
        assert!(ProducerSpec::RandomInt { min: 5, max: 1 }.validate().is_err());
        assert!(ProducerSpec::Choice { values: vec![] }.validate().is_err());
        assert!(ProducerSpec::UtcNow {
            format: "%Q".into()
        }
        .validate()
        .is_err());
        assert!(ProducerSpec::UtcDaysAgo {
            min_days: 9,
            max_days: 2,
            format: DEFAULT_DATE_FORMAT.into(),
        }
        .into_producer()
        .is_err());
    }
}
