//! Option lists for the query editor

use cosmos_streaming_sdk::{Aggregate, Decimation, ValueType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

impl From<String> for SelectOption {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

pub fn value_type_options() -> Vec<SelectOption> {
    ValueType::ALL.iter().map(|v| SelectOption::new(v.as_str())).collect()
}

pub fn decimation_options() -> Vec<SelectOption> {
    Decimation::ALL.iter().map(|d| SelectOption::new(d.as_str())).collect()
}

pub fn aggregate_options() -> Vec<SelectOption> {
    Aggregate::ALL.iter().map(|a| SelectOption::new(a.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(options: Vec<SelectOption>) -> Vec<String> {
        options.into_iter().map(|o| o.value).collect()
    }

    #[test]
    fn test_editor_order() {
        assert_eq!(values(value_type_options()), ["CONVERTED", "RAW"]);
        assert_eq!(
            values(decimation_options()),
            ["DECOM", "REDUCED_MINUTE", "REDUCED_HOUR", "REDUCED_DAY"]
        );
        assert_eq!(values(aggregate_options()), ["MIN", "MAX", "AVG", "STDDEV"]);
    }

    #[test]
    fn test_label_mirrors_value() {
        let option = SelectOption::from("INST".to_string());
        assert_eq!(option.label, "INST");
        assert_eq!(option.value, "INST");
    }
}
